//! Cache store connection management.
//!
//! The [`CacheStore`] owns a [`rusqlite::Connection`] behind a mutex so the
//! async engine can hold one handle in an `Arc` and write from wherever a
//! poll completes.  All writes are tiny single-row upserts, so holding the
//! lock across a statement is fine.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use directories::ProjectDirs;
use rusqlite::Connection;

use crate::error::{Result, StoreError};
use crate::migrations;

/// Handle to the local cache database.
pub struct CacheStore {
    conn: Mutex<Connection>,
}

impl CacheStore {
    /// Open (or create) the default cache database in the platform data
    /// directory:
    /// - Linux:   `~/.local/share/chainmail/cache.db`
    /// - macOS:   `~/Library/Application Support/org.chainmail.chainmail/cache.db`
    /// - Windows: `{FOLDERID_RoamingAppData}\chainmail\chainmail\data\cache.db`
    pub fn open_default() -> Result<Self> {
        let project_dirs =
            ProjectDirs::from("org", "chainmail", "chainmail").ok_or(StoreError::NoDataDir)?;

        let data_dir = project_dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;

        let db_path = data_dir.join("cache.db");
        tracing::info!(path = %db_path.display(), "opening cache store");

        Self::open_at(&db_path)
    }

    /// Open (or create) a cache database at an explicit path.  Used by tests
    /// and by embedders with custom directory layouts.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        conn.pragma_update(None, "journal_mode", "WAL")?;
        migrations::run_migrations(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// An in-memory store, for tests and for running without persistence.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        migrations::run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub(crate) fn conn(&self) -> MutexGuard<'_, Connection> {
        // Poisoning only happens if a writer panicked; propagating the inner
        // connection is still safe for our single-row slot writes.
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Filesystem path of the open database, if it is file-backed.
    pub fn path(&self) -> Option<PathBuf> {
        self.conn().path().map(PathBuf::from)
    }
}
