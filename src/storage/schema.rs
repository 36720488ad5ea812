//! Database schema definitions

/// File name of the location apps database
pub const DATABASE_NAME: &str = "location_apps.db";

/// Current schema version, stored in `PRAGMA user_version`
pub const SCHEMA_VERSION: i64 = 1;

/// SQL to create the apps table
pub const CREATE_APPS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS apps (
    package TEXT NOT NULL,
    location_type INTEGER NOT NULL
)
"#;

/// One package, one row
pub const CREATE_APPS_INDEX: &str = "CREATE UNIQUE INDEX IF NOT EXISTS apps_index ON apps(package)";

/// A step bringing the schema from `from` to `from + 1`.
///
/// Steps must preserve existing rows. Dropping and recreating `apps` loses
/// every classification a user has assigned.
pub struct Migration {
    pub from: i64,
    pub statements: &'static [&'static str],
}

/// Ordered migration steps. Version 0 is a fresh (or pre-versioning) file.
pub const MIGRATIONS: &[Migration] = &[Migration {
    from: 0,
    statements: &[CREATE_APPS_TABLE, CREATE_APPS_INDEX],
}];

/// Steps needed to bring a database at `found` up to [`SCHEMA_VERSION`]
pub fn migrations_from(found: i64) -> impl Iterator<Item = &'static Migration> {
    MIGRATIONS
        .iter()
        .filter(move |m| m.from >= found && m.from < SCHEMA_VERSION)
}
