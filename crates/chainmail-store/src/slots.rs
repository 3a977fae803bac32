//! Named JSON slots.
//!
//! A slot is a single named row holding one JSON document, overwritten in
//! full on every write.  This mirrors how the engine treats the inbox: a
//! snapshot is replaced, never merged.

use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;

use chainmail_types::InboxSnapshot;

use crate::database::CacheStore;
use crate::error::{Result, StoreError};

/// Slot name for the last accepted inbox snapshot.
pub const INBOX_SLOT: &str = "inbox";

/// Read/write access to the persisted inbox slot.
///
/// A seam over [`CacheStore`] so the synchronizer can be exercised against
/// a store whose write path is made to fail.
pub trait InboxCache: Send + Sync {
    fn save_inbox(&self, snapshot: &InboxSnapshot) -> Result<()>;
    fn load_inbox(&self) -> Option<InboxSnapshot>;
}

impl InboxCache for CacheStore {
    fn save_inbox(&self, snapshot: &InboxSnapshot) -> Result<()> {
        CacheStore::save_inbox(self, snapshot)
    }

    fn load_inbox(&self) -> Option<InboxSnapshot> {
        CacheStore::load_inbox(self)
    }
}

impl CacheStore {
    /// Write `value` to the named slot, replacing any previous content.
    pub fn put_slot<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)?;
        self.conn().execute(
            "INSERT INTO cache_slots (name, value, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(name) DO UPDATE SET value = ?2, updated_at = ?3",
            params![name, json, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Read the named slot, or `None` if it has never been written.
    pub fn get_slot<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        let json: Option<String> = self
            .conn()
            .query_row(
                "SELECT value FROM cache_slots WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;

        match json {
            None => Ok(None),
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|source| StoreError::CorruptSlot {
                    slot: name.to_string(),
                    source,
                }),
        }
    }

    /// Persist the last accepted inbox snapshot.
    pub fn save_inbox(&self, snapshot: &InboxSnapshot) -> Result<()> {
        self.put_slot(INBOX_SLOT, snapshot)
    }

    /// Load the last accepted inbox snapshot, if any.
    ///
    /// A corrupt slot is logged and treated as absent; a cold start must
    /// never fail because a previous version wrote an incompatible shape.
    pub fn load_inbox(&self) -> Option<InboxSnapshot> {
        match self.get_slot(INBOX_SLOT) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(error = %e, "discarding unreadable inbox slot");
                None
            }
        }
    }
}
