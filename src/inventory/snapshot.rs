//! JSON snapshot inventory
//!
//! ```json
//! {
//!   "packages": [
//!     {
//!       "package_name": "com.example.maps",
//!       "label": "Maps",
//!       "requested_permissions": [
//!         { "name": "android.permission.ACCESS_FINE_LOCATION", "flags": 2 }
//!       ]
//!     }
//!   ]
//! }
//! ```

use super::{AppMetadata, InstalledPackage, PackageInventory, RequestedPermission};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SnapshotFile {
    #[serde(default)]
    packages: Vec<SnapshotEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SnapshotEntry {
    package_name: String,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    icon: Option<String>,
    #[serde(default)]
    requested_permissions: Option<Vec<RequestedPermission>>,
}

/// Inventory read from a JSON file
#[derive(Debug, Clone)]
pub struct SnapshotInventory {
    packages: Vec<InstalledPackage>,
    metadata: HashMap<String, AppMetadata>,
}

impl SnapshotInventory {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Inventory(format!("cannot read snapshot {}: {}", path.display(), e))
        })?;
        let inventory = Self::from_json(&contents)?;
        tracing::debug!("Loaded {} packages from {}", inventory.packages.len(), path.display());
        Ok(inventory)
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        let file: SnapshotFile = serde_json::from_str(contents)?;

        let mut packages = Vec::with_capacity(file.packages.len());
        let mut metadata = HashMap::new();
        for entry in file.packages {
            metadata.insert(
                entry.package_name.clone(),
                AppMetadata {
                    label: entry.label,
                    icon: entry.icon,
                },
            );
            packages.push(InstalledPackage::new(entry.package_name, entry.requested_permissions));
        }

        Ok(Self { packages, metadata })
    }
}

impl PackageInventory for SnapshotInventory {
    fn installed_packages(&self) -> Result<Vec<InstalledPackage>> {
        Ok(self.packages.clone())
    }

    fn application_info(&self, package_name: &str) -> Option<AppMetadata> {
        self.metadata.get(package_name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::{ACCESS_FINE_LOCATION, PermissionGrants};

    const SNAPSHOT: &str = r#"{
        "packages": [
            {
                "package_name": "com.example.maps",
                "label": "Maps",
                "icon": "🗺️",
                "requested_permissions": [
                    { "name": "android.permission.ACCESS_FINE_LOCATION", "flags": 2 }
                ]
            },
            { "package_name": "com.example.calc" }
        ]
    }"#;

    #[test]
    fn test_parse_snapshot() {
        let inventory = SnapshotInventory::from_json(SNAPSHOT).unwrap();
        let packages = inventory.installed_packages().unwrap();

        assert_eq!(packages.len(), 2);
        assert_eq!(packages[0].requested_permissions.as_ref().unwrap()[0].name, ACCESS_FINE_LOCATION);
        assert_eq!(packages[0].location_grants(), Some(PermissionGrants { coarse: false, fine: true }));
        assert_eq!(packages[1].requested_permissions, None);

        let maps = inventory.application_info("com.example.maps").unwrap();
        assert_eq!(maps.label.as_deref(), Some("Maps"));
        assert_eq!(inventory.application_info("com.example.calc").unwrap().label, None);
        assert_eq!(inventory.application_info("com.example.gone"), None);
    }

    #[test]
    fn test_missing_file_is_inventory_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = SnapshotInventory::load(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, Error::Inventory(_)));
    }

    #[test]
    fn test_malformed_json_rejected() {
        assert!(matches!(SnapshotInventory::from_json("{ \"packages\": 3 }"), Err(Error::Json(_))));
    }
}
