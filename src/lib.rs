//! # Locapps - Per-app location access tracking
//!
//! Remembers, for every installed application, which class of location access
//! it has been observed to request, and turns that into a listing of apps
//! annotated with their classification and granted location permissions.
//!
//! Locapps provides:
//! - SQLite-backed storage of one classification per package
//! - Package inventories (JSON snapshots, `adb shell dumpsys package`)
//! - A population pass that seeds records for location-requesting packages
//! - A presenter that joins records with permission grants and app metadata
//! - A lifecycle-aware screen that runs population and listing as tasks

pub mod access;
pub mod storage;
pub mod inventory;
pub mod presenter;
pub mod screen;
pub mod config;
pub mod ui;

// Re-exports for convenient access
pub use access::LocationAccessType;
pub use storage::{AppLocationRecord, LocationAppsDb, StoreSession, UpsertOutcome};
pub use inventory::{AppMetadata, InstalledPackage, PackageInventory, PermissionGrants, RequestedPermission};
pub use presenter::{AppLocationItem, PermissionTable};
pub use screen::{HostShell, Lifecycle, LifecycleState, LocationAppsScreen, RefreshOutcome};

use std::path::PathBuf;
use std::sync::Arc;

/// Result type alias for Locapps operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Locapps operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Storage unavailable at {}: {source}", path.display())]
    StorageUnavailable {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Database schema version {found} is newer than supported version {supported}")]
    SchemaTooNew { found: i64, supported: i64 },

    #[error("Invalid location access type: {0}")]
    InvalidAccessType(String),

    #[error("Inventory error: {0}")]
    Inventory(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Population pass failed: {0}")]
    Population(Arc<Error>),

    #[error("Task error: {0}")]
    Task(String),
}
