use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::storage::schema::DATABASE_NAME;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct LocappsConfig {
    pub database: Option<String>,
    /// JSON inventory snapshot used when no device is queried
    pub snapshot: Option<String>,
    /// Query a device over adb
    #[serde(default)]
    pub adb: bool,
    pub adb_serial: Option<String>,
    pub adb_bin: Option<String>,
}

impl LocappsConfig {
    /// Whether any adb setting selects a device as the package source
    pub fn uses_adb(&self) -> bool {
        self.adb || self.adb_serial.is_some() || self.adb_bin.is_some()
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("locapps.toml")
}

/// Well-known database location under an app's private storage root
pub fn default_database_path_in(base: &Path) -> PathBuf {
    base.join("databases").join(DATABASE_NAME)
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<LocappsConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: LocappsConfig = toml::from_str(&contents)?;
    tracing::debug!("Loaded config from {}", path.display());
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &LocappsConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_database_path() {
        let path = default_database_path_in(Path::new("/data/app"));
        assert_eq!(path, PathBuf::from("/data/app/databases/location_apps.db"));
    }

    #[test]
    fn test_missing_config_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_config(Some(&dir.path().join("locapps.toml"))).unwrap(), None);
    }

    #[test]
    fn test_write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("locapps.toml");
        let config = LocappsConfig {
            database: Some("state/location_apps.db".to_string()),
            adb_serial: Some("emulator-5554".to_string()),
            ..Default::default()
        };

        write_config(&path, &config, false).unwrap();
        assert_eq!(load_config(Some(&path)).unwrap(), Some(config.clone()));

        assert!(write_config(&path, &config, false).is_err());
        write_config(&path, &LocappsConfig::default(), true).unwrap();
        assert_eq!(load_config(Some(&path)).unwrap(), Some(LocappsConfig::default()));
    }

    #[test]
    fn test_adb_flag_round_trips_and_defaults_off() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("locapps.toml");
        let config = LocappsConfig {
            adb: true,
            ..Default::default()
        };

        write_config(&path, &config, false).unwrap();
        let loaded = load_config(Some(&path)).unwrap().unwrap();
        assert!(loaded.adb);
        assert!(loaded.uses_adb());

        std::fs::write(&path, "database = \"db/location_apps.db\"\n").unwrap();
        let legacy = load_config(Some(&path)).unwrap().unwrap();
        assert!(!legacy.adb);
        assert!(!legacy.uses_adb());
    }
}
