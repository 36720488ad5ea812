//! Live device inventory through `adb shell dumpsys package packages`
//!
//! Only the parts of the dump needed for location tracking are read:
//!
//! ```text
//!   Package [com.example.maps] (3f2a1b7):
//!     requested permissions:
//!       android.permission.ACCESS_FINE_LOCATION
//!       android.permission.INTERNET
//!     install permissions:
//!       android.permission.INTERNET: granted=true
//!     User 0: ceDataInode=4711 installed=true
//!       runtime permissions:
//!         android.permission.ACCESS_FINE_LOCATION: granted=true, flags=[ USER_SET ]
//! ```
//!
//! The dump carries no application labels or icons.

use super::{AppMetadata, InstalledPackage, PackageInventory, RequestedPermission, REQUESTED_PERMISSION_GRANTED};
use crate::{Error, Result};
use regex::Regex;
use std::collections::HashSet;
use std::process::Command;
use std::sync::OnceLock;

fn package_header() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*Package \[([^\]]+)\]").expect("valid regex"))
}

fn requested_header() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*requested permissions:\s*$").expect("valid regex"))
}

fn grants_header() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(install|runtime) permissions:\s*$").expect("valid regex"))
}

fn requested_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Newer releases append ": restricted=true"
    RE.get_or_init(|| Regex::new(r"^\s*(\S+?)(?::\s*restricted=\w+)?\s*$").expect("valid regex"))
}

fn grant_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(\S+?): granted=(true|false)").expect("valid regex"))
}

#[derive(Clone, Copy, PartialEq)]
enum Section {
    None,
    Requested,
    Grants,
}

#[derive(Default)]
struct PackageBlock {
    name: String,
    requested: Option<Vec<String>>,
    granted: HashSet<String>,
}

impl PackageBlock {
    fn finish(self) -> InstalledPackage {
        let granted = self.granted;
        let requested = self.requested.map(|names| {
            names
                .into_iter()
                .map(|name| {
                    let flags = if granted.contains(&name) { REQUESTED_PERMISSION_GRANTED } else { 0 };
                    RequestedPermission::new(name, flags)
                })
                .collect()
        });
        InstalledPackage::new(self.name, requested)
    }
}

/// Parse the output of `dumpsys package packages`.
///
/// A package listed more than once (e.g. again under "Hidden system
/// packages") keeps its first block.
pub fn parse_dumpsys_packages(output: &str) -> Vec<InstalledPackage> {
    let mut packages = Vec::new();
    let mut seen = HashSet::new();
    let mut current: Option<PackageBlock> = None;
    let mut section = Section::None;

    let mut flush = |block: Option<PackageBlock>, packages: &mut Vec<InstalledPackage>| {
        if let Some(block) = block {
            if seen.insert(block.name.clone()) {
                packages.push(block.finish());
            }
        }
    };

    for line in output.lines() {
        if let Some(caps) = package_header().captures(line) {
            flush(current.take(), &mut packages);
            current = Some(PackageBlock {
                name: caps[1].to_string(),
                ..Default::default()
            });
            section = Section::None;
            continue;
        }

        let Some(block) = current.as_mut() else {
            continue;
        };

        if requested_header().is_match(line) {
            block.requested.get_or_insert_with(Vec::new);
            section = Section::Requested;
            continue;
        }
        if grants_header().is_match(line) {
            section = Section::Grants;
            continue;
        }

        match section {
            Section::Requested => match requested_line().captures(line) {
                Some(caps) => {
                    if let Some(requested) = block.requested.as_mut() {
                        requested.push(caps[1].to_string());
                    }
                }
                None => section = Section::None,
            },
            Section::Grants => match grant_line().captures(line) {
                Some(caps) => {
                    if &caps[2] == "true" {
                        block.granted.insert(caps[1].to_string());
                    }
                }
                None => section = Section::None,
            },
            Section::None => {}
        }
    }
    flush(current.take(), &mut packages);

    packages
}

/// Inventory of a device reachable over adb
#[derive(Debug, Clone)]
pub struct AdbInventory {
    bin: String,
    serial: Option<String>,
}

impl Default for AdbInventory {
    fn default() -> Self {
        Self {
            bin: "adb".into(),
            serial: None,
        }
    }
}

impl AdbInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bin(mut self, bin: String) -> Self {
        self.bin = bin;
        self
    }

    pub fn with_serial(mut self, serial: String) -> Self {
        self.serial = Some(serial);
        self
    }

    fn dumpsys_packages(&self) -> Result<String> {
        let mut cmd = Command::new(&self.bin);
        if let Some(ref serial) = self.serial {
            cmd.args(["-s", serial]);
        }
        cmd.args(["shell", "dumpsys", "package", "packages"]);

        tracing::debug!("Running {:?}", cmd);
        let output = cmd
            .output()
            .map_err(|e| Error::Inventory(format!("failed to run {}: {}", self.bin, e)))?;
        if !output.status.success() {
            return Err(Error::Inventory(format!(
                "dumpsys failed ({}): {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl PackageInventory for AdbInventory {
    fn installed_packages(&self) -> Result<Vec<InstalledPackage>> {
        let dump = self.dumpsys_packages()?;
        let packages = parse_dumpsys_packages(&dump);
        tracing::info!("Device reports {} installed packages", packages.len());
        Ok(packages)
    }

    fn application_info(&self, _package_name: &str) -> Option<AppMetadata> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::{ACCESS_COARSE_LOCATION, ACCESS_FINE_LOCATION, PermissionGrants};
    use std::collections::HashMap;

    fn index_by_name(packages: &[InstalledPackage]) -> HashMap<&str, &InstalledPackage> {
        packages.iter().map(|p| (p.package_name.as_str(), p)).collect()
    }

    const DUMP: &str = "\
Packages:
  Package [com.example.maps] (3f2a1b7):
    userId=10123
    requested permissions:
      android.permission.ACCESS_FINE_LOCATION
      android.permission.ACCESS_COARSE_LOCATION
      android.permission.INTERNET
    install permissions:
      android.permission.INTERNET: granted=true
    User 0: ceDataInode=4711 installed=true hidden=false
      runtime permissions:
        android.permission.ACCESS_FINE_LOCATION: granted=false, flags=[ USER_SET ]
        android.permission.ACCESS_COARSE_LOCATION: granted=true, flags=[ USER_SET ]
  Package [com.example.calc] (9c0ffee):
    userId=10124
    User 0: ceDataInode=4712 installed=true hidden=false
  Package [com.example.weather] (1234abc):
    requested permissions:
      android.permission.ACCESS_FINE_LOCATION: restricted=false
    install permissions:
      android.permission.ACCESS_FINE_LOCATION: granted=true

Hidden system packages:
  Package [com.example.maps] (0000000):
    requested permissions:
      android.permission.INTERNET
";

    #[test]
    fn test_parse_requested_and_granted() {
        let packages = parse_dumpsys_packages(DUMP);
        let by_name = index_by_name(&packages);
        assert_eq!(packages.len(), 3);

        let maps = by_name["com.example.maps"];
        let requested = maps.requested_permissions.as_ref().unwrap();
        assert_eq!(requested.len(), 3);
        assert_eq!(requested[0].name, ACCESS_FINE_LOCATION);
        assert_eq!(requested[1].name, ACCESS_COARSE_LOCATION);
        assert_eq!(maps.location_grants(), Some(PermissionGrants { coarse: true, fine: false }));

        let weather = by_name["com.example.weather"];
        assert_eq!(weather.location_grants(), Some(PermissionGrants { coarse: false, fine: true }));
    }

    #[test]
    fn test_package_without_permissions() {
        let packages = parse_dumpsys_packages(DUMP);
        let calc = index_by_name(&packages)["com.example.calc"];
        assert_eq!(calc.requested_permissions, None);
        assert!(!calc.requests_location());
    }

    #[test]
    fn test_vendor_permission_names_keep_the_section_open() {
        let dump = "\
  Package [com.vendor.launcher] (77aa001):
    requested permissions:
      com.vendor.permission.BADGE-COUNT
      com.vendor.permission.READ_SETTINGS$1
      android.permission.ACCESS_FINE_LOCATION
    install permissions:
      com.vendor.permission.BADGE-COUNT: granted=true
      android.permission.ACCESS_FINE_LOCATION: granted=true
";
        let packages = parse_dumpsys_packages(dump);
        assert_eq!(packages.len(), 1);

        let requested = packages[0].requested_permissions.as_ref().unwrap();
        let names: Vec<&str> = requested.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["com.vendor.permission.BADGE-COUNT", "com.vendor.permission.READ_SETTINGS$1", ACCESS_FINE_LOCATION]
        );
        assert!(requested[0].is_granted());
        assert!(packages[0].requests_location());
        assert_eq!(packages[0].location_grants(), Some(PermissionGrants { coarse: false, fine: true }));
    }

    #[test]
    fn test_missing_adb_binary() {
        let inventory = AdbInventory::new().with_bin("/nonexistent/adb-binary".into());
        assert!(matches!(inventory.installed_packages(), Err(Error::Inventory(_))));
        assert_eq!(inventory.application_info("com.example.maps"), None);
    }
}
