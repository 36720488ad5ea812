//! SQLite storage implementation

use std::path::{Path, PathBuf};
use rusqlite::{Connection, params, OptionalExtension};
use serde::Serialize;
use crate::{Result, Error};
use crate::access::LocationAccessType;
use super::schema;

/// One row of the `apps` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppLocationRecord {
    pub package_name: String,
    pub access_type: LocationAccessType,
}

impl AppLocationRecord {
    pub fn new(package_name: impl Into<String>, access_type: LocationAccessType) -> Self {
        Self {
            package_name: package_name.into(),
            access_type,
        }
    }
}

/// What `insert_or_update` did to the row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// Handle to the location apps database.
///
/// Holds no connection. Every operation runs on a [`StoreSession`] that is
/// opened for it and closed when dropped, so the handle can be cloned into
/// any task or thread.
#[derive(Debug, Clone)]
pub struct LocationAppsDb {
    path: PathBuf,
}

impl LocationAppsDb {
    /// Open a database file (creates it and its directory if missing)
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| unavailable(&path, e))?;
            }
        }

        let session = StoreSession::connect(&path)?;
        session.initialize_schema().map_err(|e| match e {
            Error::Storage(e) => unavailable(&path, e),
            other => other,
        })?;
        session.close()?;

        tracing::debug!("Opened location apps database at {}", path.display());
        Ok(Self { path })
    }

    /// Open the database at its well-known location under `base`
    pub fn open_default(base: &Path) -> Result<Self> {
        Self::open(crate::config::default_database_path_in(base))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a session for a sequence of operations.
    ///
    /// The connection closes when the session is dropped.
    pub fn session(&self) -> Result<StoreSession> {
        StoreSession::connect(&self.path)
    }

    // ========== One-shot Operations ==========
    // Each opens a session, runs one operation, and closes it again.

    pub fn insert_if_missing(&self, package_name: &str, access_type: LocationAccessType) -> Result<bool> {
        self.session()?.insert_if_missing(package_name, access_type)
    }

    pub fn insert_or_update(&self, package_name: &str, access_type: LocationAccessType) -> Result<UpsertOutcome> {
        self.session()?.insert_or_update(package_name, access_type)
    }

    pub fn list_apps_by_package_name(&self) -> Result<Vec<AppLocationRecord>> {
        self.session()?.list_apps_by_package_name()
    }

    pub fn get(&self, package_name: &str) -> Result<Option<AppLocationRecord>> {
        self.session()?.get(package_name)
    }

    pub fn stats(&self) -> Result<DbStats> {
        self.session()?.stats()
    }
}

fn unavailable(path: &Path, source: impl std::error::Error + Send + Sync + 'static) -> Error {
    Error::StorageUnavailable {
        path: path.to_path_buf(),
        source: Box::new(source),
    }
}

/// An open connection to the location apps database
pub struct StoreSession {
    conn: Connection,
}

impl StoreSession {
    fn connect(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| unavailable(path, e))?;
        Ok(Self { conn })
    }

    /// Bring the schema up to [`schema::SCHEMA_VERSION`]
    fn initialize_schema(&self) -> Result<()> {
        let found: i64 = self.conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
        if found > schema::SCHEMA_VERSION {
            return Err(Error::SchemaTooNew {
                found,
                supported: schema::SCHEMA_VERSION,
            });
        }
        if found == schema::SCHEMA_VERSION {
            return Ok(());
        }

        let tx = self.conn.unchecked_transaction()?;
        for migration in schema::migrations_from(found) {
            tracing::info!("Migrating location apps schema from version {}", migration.from);
            for stmt in migration.statements {
                tx.execute(stmt, [])?;
            }
        }
        tx.pragma_update(None, "user_version", schema::SCHEMA_VERSION)?;
        tx.commit()?;
        Ok(())
    }

    /// Insert a record unless one already exists for the package.
    ///
    /// An existing row is left as is, whatever `access_type` is passed.
    /// Returns whether a row was inserted.
    pub fn insert_if_missing(&self, package_name: &str, access_type: LocationAccessType) -> Result<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO apps (package, location_type) VALUES (?1, ?2)",
            params![package_name, access_type],
        )?;
        if inserted > 0 {
            tracing::debug!(package = package_name, access = %access_type, "Recorded new location app");
        }
        Ok(inserted > 0)
    }

    /// Insert a record, or overwrite the existing one for the package
    pub fn insert_or_update(&self, package_name: &str, access_type: LocationAccessType) -> Result<UpsertOutcome> {
        let tx = self.conn.unchecked_transaction()?;
        let inserted = tx.execute(
            "INSERT OR IGNORE INTO apps (package, location_type) VALUES (?1, ?2)",
            params![package_name, access_type],
        )?;
        let outcome = if inserted > 0 {
            UpsertOutcome::Inserted
        } else {
            tx.execute(
                "UPDATE apps SET location_type = ?2 WHERE package = ?1",
                params![package_name, access_type],
            )?;
            UpsertOutcome::Updated
        };
        tx.commit()?;

        tracing::debug!(package = package_name, access = %access_type, ?outcome, "Stored location app");
        Ok(outcome)
    }

    /// All records, ascending by package name (byte order)
    pub fn list_apps_by_package_name(&self) -> Result<Vec<AppLocationRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT package, location_type FROM apps ORDER BY package ASC"
        )?;

        let records = stmt
            .query_map([], |row| self.row_to_record(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(records)
    }

    /// Get the record for a package
    pub fn get(&self, package_name: &str) -> Result<Option<AppLocationRecord>> {
        self.conn
            .query_row(
                "SELECT package, location_type FROM apps WHERE package = ?1",
                [package_name],
                |row| self.row_to_record(row),
            )
            .optional()
            .map_err(Into::into)
    }

    /// Count all records
    pub fn count(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row("SELECT COUNT(*) FROM apps", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Record counts, total and per classification
    pub fn stats(&self) -> Result<DbStats> {
        let mut stmt = self.conn.prepare(
            "SELECT location_type, COUNT(*) FROM apps GROUP BY location_type"
        )?;

        let mut stats = DbStats::default();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, LocationAccessType>(0)?, row.get::<_, i64>(1)?))
        })?;
        for row in rows {
            let (access_type, count) = row?;
            stats.by_type[access_type.code() as usize] = count as usize;
            stats.total += count as usize;
        }

        Ok(stats)
    }

    /// Close the connection, surfacing any error the drop would swallow
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| e.into())
    }

    /// Helper to convert a row to an AppLocationRecord
    fn row_to_record(&self, row: &rusqlite::Row) -> rusqlite::Result<AppLocationRecord> {
        Ok(AppLocationRecord {
            package_name: row.get(0)?,
            access_type: row.get(1)?,
        })
    }
}

/// Database statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct DbStats {
    pub total: usize,
    /// Indexed by [`LocationAccessType::code`]
    pub by_type: [usize; 4],
}

impl DbStats {
    pub fn count_of(&self, access_type: LocationAccessType) -> usize {
        self.by_type[access_type.code() as usize]
    }
}

impl std::fmt::Display for DbStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Database Statistics:")?;
        writeln!(f, "  Apps: {}", self.total)?;
        for access_type in LocationAccessType::all() {
            writeln!(f, "  {}: {}", access_type, self.count_of(*access_type))?;
        }
        Ok(())
    }
}
