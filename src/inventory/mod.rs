//! Package inventory - what is installed and which permissions it holds
//!
//! Inventories report, per installed package, the permissions it requests and
//! a grant-flag bitmask per requested permission. Sources:
//! - `SnapshotInventory`: a JSON file captured ahead of time
//! - `AdbInventory`: a live device via `adb shell dumpsys package`

pub mod dumpsys;
pub mod snapshot;

pub use dumpsys::AdbInventory;
pub use snapshot::SnapshotInventory;

use crate::Result;
use serde::{Deserialize, Serialize};

pub const ACCESS_FINE_LOCATION: &str = "android.permission.ACCESS_FINE_LOCATION";
pub const ACCESS_COARSE_LOCATION: &str = "android.permission.ACCESS_COARSE_LOCATION";

/// The permission is currently granted
pub const REQUESTED_PERMISSION_GRANTED: u32 = 1 << 1;
/// The permission was granted implicitly by the platform
pub const REQUESTED_PERMISSION_IMPLICIT: u32 = 1 << 2;

/// A permission named by a package, with its grant flags
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedPermission {
    pub name: String,
    #[serde(default)]
    pub flags: u32,
}

impl RequestedPermission {
    pub fn new(name: impl Into<String>, flags: u32) -> Self {
        Self {
            name: name.into(),
            flags,
        }
    }

    pub fn is_granted(&self) -> bool {
        self.flags & (REQUESTED_PERMISSION_GRANTED | REQUESTED_PERMISSION_IMPLICIT) != 0
    }
}

/// An installed package as reported by an inventory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledPackage {
    pub package_name: String,
    /// `None` when the package declares no permissions at all
    #[serde(default)]
    pub requested_permissions: Option<Vec<RequestedPermission>>,
}

impl InstalledPackage {
    pub fn new(package_name: impl Into<String>, requested_permissions: Option<Vec<RequestedPermission>>) -> Self {
        Self {
            package_name: package_name.into(),
            requested_permissions,
        }
    }

    /// Whether the package asks for fine or coarse location
    pub fn requests_location(&self) -> bool {
        self.requested_permissions.iter().flatten().any(|p| {
            p.name == ACCESS_FINE_LOCATION || p.name == ACCESS_COARSE_LOCATION
        })
    }

    /// Grant state of both location permissions.
    ///
    /// `None` for a package without a permission list; a permission that is
    /// not requested counts as not granted.
    pub fn location_grants(&self) -> Option<PermissionGrants> {
        let permissions = self.requested_permissions.as_ref()?;
        let mut grants = PermissionGrants::default();
        for permission in permissions {
            match permission.name.as_str() {
                ACCESS_FINE_LOCATION => grants.fine = permission.is_granted(),
                ACCESS_COARSE_LOCATION => grants.coarse = permission.is_granted(),
                _ => {}
            }
        }
        Some(grants)
    }
}

/// Whether each location permission is granted to a package
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PermissionGrants {
    pub coarse: bool,
    pub fine: bool,
}

/// Display metadata for an installed application
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppMetadata {
    pub label: Option<String>,
    pub icon: Option<String>,
}

/// Source of installed packages and their metadata
pub trait PackageInventory: Send + Sync {
    /// Every installed package with its requested permissions
    fn installed_packages(&self) -> Result<Vec<InstalledPackage>>;

    /// Metadata for one package, `None` if it is no longer installed
    fn application_info(&self, package_name: &str) -> Option<AppMetadata>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grant_flags() {
        assert!(RequestedPermission::new(ACCESS_FINE_LOCATION, REQUESTED_PERMISSION_GRANTED).is_granted());
        assert!(RequestedPermission::new(ACCESS_FINE_LOCATION, REQUESTED_PERMISSION_IMPLICIT).is_granted());
        assert!(!RequestedPermission::new(ACCESS_FINE_LOCATION, 1).is_granted());
        assert!(!RequestedPermission::new(ACCESS_FINE_LOCATION, 0).is_granted());
    }

    #[test]
    fn test_location_grants() {
        let pkg = InstalledPackage::new(
            "com.example.maps",
            Some(vec![
                RequestedPermission::new("android.permission.INTERNET", REQUESTED_PERMISSION_GRANTED),
                RequestedPermission::new(ACCESS_COARSE_LOCATION, REQUESTED_PERMISSION_GRANTED),
                RequestedPermission::new(ACCESS_FINE_LOCATION, 0),
            ]),
        );
        assert!(pkg.requests_location());
        assert_eq!(pkg.location_grants(), Some(PermissionGrants { coarse: true, fine: false }));
    }

    #[test]
    fn test_no_location_requested() {
        let pkg = InstalledPackage::new(
            "com.example.notes",
            Some(vec![RequestedPermission::new("android.permission.INTERNET", REQUESTED_PERMISSION_GRANTED)]),
        );
        assert!(!pkg.requests_location());
        assert_eq!(pkg.location_grants(), Some(PermissionGrants::default()));

        let bare = InstalledPackage::new("com.example.bare", None);
        assert!(!bare.requests_location());
        assert_eq!(bare.location_grants(), None);
    }
}
