//! # chainmail-api
//!
//! Transport layer for the Chainmail engine: the off-chain REST message
//! store and the content-addressed body store, both behind traits so the
//! engine can be driven by in-memory fakes in tests.
//!
//! Failures here are never fatal to a caller; every method returns a typed
//! [`ApiError`] and the engine decides whether to retry on its next natural
//! trigger.

pub mod content;
pub mod rest;

mod error;

pub use content::{ContentStore, IpfsStore};
pub use error::{ApiError, Result};
pub use rest::{HttpApi, InboxApi};
