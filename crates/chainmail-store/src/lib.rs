//! # chainmail-store
//!
//! Durable local cache for offline-first rendering.
//!
//! The store holds named JSON slots in a local SQLite database.  The only
//! slot the engine relies on today is `"inbox"`: the last accepted
//! [`chainmail_types::InboxSnapshot`], read at cold start so the UI can
//! render instantly from last-known-good state before the first network
//! poll completes, and overwritten on every accepted poll.

pub mod database;
pub mod slots;

mod error;
mod migrations;

pub use database::CacheStore;
pub use error::{Result, StoreError};
pub use slots::{InboxCache, INBOX_SLOT};
