//! Installed-app location presenter
//!
//! Two steps, both blocking:
//! 1. [`populate`] walks the inventory, records grant state per package and
//!    seeds a `NoLocation` row for every package asking for location.
//! 2. [`build_items`] joins the stored rows with grant state and app metadata
//!    into display items sorted by title.

use crate::access::LocationAccessType;
use crate::inventory::{PackageInventory, PermissionGrants};
use crate::storage::{AppLocationRecord, LocationAppsDb};
use crate::Result;
use serde::Serialize;
use std::collections::HashMap;

/// Key prefix of every item, followed by the package name
pub const ITEM_KEY_PREFIX: &str = "pref_location_app_";

/// Icon shown when an app provides none
pub const DEFAULT_APP_ICON: &str = crate::ui::Icons::PACKAGE;

/// Location grant state of every package that declares permissions
pub type PermissionTable = HashMap<String, PermissionGrants>;

/// Totals of one population pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PopulationSummary {
    pub packages: usize,
    pub location_packages: usize,
    pub newly_recorded: usize,
}

/// Enumerate installed packages and seed missing records.
///
/// Every insert of the pass goes through one session, closed when the pass
/// ends. Existing rows are never modified.
pub fn populate(
    inventory: &dyn PackageInventory,
    db: &LocationAppsDb,
) -> Result<(PermissionTable, PopulationSummary)> {
    let packages = inventory.installed_packages()?;
    let session = db.session()?;

    let mut permissions = PermissionTable::new();
    let mut summary = PopulationSummary {
        packages: packages.len(),
        ..Default::default()
    };

    for package in &packages {
        let Some(grants) = package.location_grants() else {
            continue;
        };
        if package.requests_location() {
            summary.location_packages += 1;
            if session.insert_if_missing(&package.package_name, LocationAccessType::NoLocation)? {
                summary.newly_recorded += 1;
            }
        }
        permissions.insert(package.package_name.clone(), grants);
    }
    session.close()?;

    tracing::info!(
        packages = summary.packages,
        location_packages = summary.location_packages,
        newly_recorded = summary.newly_recorded,
        "Population pass complete"
    );
    Ok((permissions, summary))
}

/// One row of the installed-app location listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppLocationItem {
    /// Stable identifier, `pref_location_app_<package>`
    pub key: String,
    pub title: String,
    pub summary: String,
    pub icon: String,
    /// Position in the listing, assigned after sorting
    pub order: usize,
    pub package_name: String,
    pub access_type: LocationAccessType,
    /// `None` when the package was not seen by the population pass
    pub grants: Option<PermissionGrants>,
}

fn grant_label(granted: Option<bool>) -> &'static str {
    match granted {
        Some(true) => "true",
        Some(false) => "false",
        None => "unknown",
    }
}

/// Summary line shown under an app's title.
///
/// A package missing from the permission table has no known grants; both
/// permission fields then read `unknown` rather than a null placeholder.
pub fn summary_line(access_type: LocationAccessType, grants: Option<PermissionGrants>) -> String {
    format!(
        "Type: {} Coarse Perm: {} Fine Perm: {}",
        access_type.as_str(),
        grant_label(grants.map(|g| g.coarse)),
        grant_label(grants.map(|g| g.fine)),
    )
}

/// Join stored records with grant state and app metadata.
///
/// Apps that are no longer installed keep their package name as title and
/// get the default icon. The result is sorted case-insensitively by title
/// and numbered from zero.
pub fn build_items(
    records: Vec<AppLocationRecord>,
    permissions: &PermissionTable,
    inventory: &dyn PackageInventory,
) -> Vec<AppLocationItem> {
    let mut items: Vec<AppLocationItem> = records
        .into_iter()
        .map(|record| {
            let metadata = inventory.application_info(&record.package_name);
            if metadata.is_none() {
                tracing::debug!(package = %record.package_name, "No application info, using fallbacks");
            }
            let metadata = metadata.unwrap_or_default();
            let grants = permissions.get(&record.package_name).copied();

            AppLocationItem {
                key: format!("{}{}", ITEM_KEY_PREFIX, record.package_name),
                title: metadata.label.unwrap_or_else(|| record.package_name.clone()),
                summary: summary_line(record.access_type, grants),
                icon: metadata.icon.unwrap_or_else(|| DEFAULT_APP_ICON.to_string()),
                order: 0,
                package_name: record.package_name,
                access_type: record.access_type,
                grants,
            }
        })
        .collect();

    items.sort_by_cached_key(|item| item.title.to_lowercase());
    for (idx, item) in items.iter_mut().enumerate() {
        item.order = idx;
    }
    items
}

/// Read every record and build the listing
pub fn load_items(
    db: &LocationAppsDb,
    permissions: &PermissionTable,
    inventory: &dyn PackageInventory,
) -> Result<Vec<AppLocationItem>> {
    let records = db.list_apps_by_package_name()?;
    Ok(build_items(records, permissions, inventory))
}
