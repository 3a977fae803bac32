//! Schema migrations, guarded by `PRAGMA user_version` so each one runs
//! exactly once.

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Current schema version.  Bump this and append a migration whenever the
/// schema changes.
const CURRENT_VERSION: u32 = 1;

const V001_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS cache_slots (
    name       TEXT PRIMARY KEY NOT NULL,
    value      TEXT NOT NULL,               -- JSON document
    updated_at TEXT NOT NULL                -- ISO-8601 / RFC-3339
);
"#;

pub fn run_migrations(conn: &Connection) -> Result<()> {
    let current: u32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    tracing::debug!(
        current_version = current,
        target_version = CURRENT_VERSION,
        "checking cache store migrations"
    );

    if current < 1 {
        conn.execute_batch(V001_SQL)
            .map_err(|e| StoreError::Migration(e.to_string()))?;
        conn.pragma_update(None, "user_version", 1)?;
    }

    Ok(())
}
