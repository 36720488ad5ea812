//! Storage Layer - SQLite-backed persistence
//!
//! System of record is a single SQLite table:
//! - apps(package, location_type), unique on package

pub mod schema;
pub mod sqlite;

pub use sqlite::{AppLocationRecord, DbStats, LocationAppsDb, StoreSession, UpsertOutcome};
