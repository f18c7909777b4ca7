//! SQLite layout for the bucketed key-value store
//!
//! Buckets form a tree (`parent_id = 0` is the top level). Entries are
//! byte keys and byte values scoped to one bucket; because keys are BLOBs
//! they iterate in bytewise lexicographic order.

use rusqlite::{Connection, OptionalExtension, Result};

/// Current layout version
pub const SCHEMA_VERSION: i32 = 1;

/// Parent ID used for top-level buckets
pub const ROOT_PARENT: i64 = 0;

/// Initialize the layout tables
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Layout version tracking
        CREATE TABLE IF NOT EXISTS schema_info (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        -- Named buckets, nested through parent_id
        CREATE TABLE IF NOT EXISTS buckets (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            parent_id INTEGER NOT NULL,
            name BLOB NOT NULL,
            sequence INTEGER NOT NULL DEFAULT 0,
            UNIQUE (parent_id, name)
        );

        -- Key/value pairs inside a bucket
        CREATE TABLE IF NOT EXISTS entries (
            bucket_id INTEGER NOT NULL,
            key BLOB NOT NULL,
            value BLOB NOT NULL,
            PRIMARY KEY (bucket_id, key),
            FOREIGN KEY (bucket_id) REFERENCES buckets(id) ON DELETE CASCADE
        ) WITHOUT ROWID;
        "#,
    )?;

    conn.execute(
        "INSERT OR REPLACE INTO schema_info (key, value) VALUES ('version', ?)",
        [SCHEMA_VERSION.to_string()],
    )?;

    Ok(())
}

/// Get the current layout version from the database
pub fn get_schema_version(conn: &Connection) -> Result<Option<i32>> {
    let version: Option<String> = conn
        .query_row(
            "SELECT value FROM schema_info WHERE key = 'version'",
            [],
            |row| row.get(0),
        )
        .optional()?;

    Ok(version.and_then(|v| v.parse().ok()))
}

/// Check if the layout still needs to be created
pub fn needs_init(conn: &Connection) -> bool {
    let table_exists: bool = conn
        .prepare("SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_info'")
        .and_then(|mut stmt| stmt.exists([]))
        .unwrap_or(false);

    if !table_exists {
        return true;
    }

    match get_schema_version(conn) {
        Ok(Some(v)) => v < SCHEMA_VERSION,
        _ => true,
    }
}
