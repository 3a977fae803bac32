//! # chainmail-client
//!
//! The message/inbox synchronization engine and NFT-metadata resolution
//! layer for the Chainmail messaging overlay.
//!
//! The engine reconciles server-authoritative, polled state against locally
//! rendered state:
//!
//! - [`sync::InboxSynchronizer`] polls the inbox, diffs structurally against
//!   the current snapshot and persists accepted snapshots for offline-first
//!   cold starts.
//! - [`resolver::ContentResolver`] expands opaque content pointers into
//!   message bodies, memoized by pointer.
//! - [`project`] maps authoritative records into a `left`/`right` annotated
//!   sequence relative to the viewing account.
//! - [`read_state::ReadStateTracker`] turns visibility signals into read
//!   writes and reconciles the server's response back into the projection.
//! - [`metadata`] merges heterogeneous provider schemas behind a fallback
//!   chain and a structurally gated cache.
//!
//! No failure in any of these paths is fatal: the user-visible failure mode
//! is always "missing enrichment" or "stale inbox".

pub mod config;
pub mod metadata;
pub mod project;
pub mod read_state;
pub mod resolver;
pub mod scheduler;
pub mod session;
pub mod sync;

mod error;

pub use config::ClientConfig;
pub use error::{MetadataError, ProviderError, ReadError, ResolveError, SyncError};
pub use session::ChatSession;
