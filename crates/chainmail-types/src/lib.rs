//! # chainmail-types
//!
//! Shared domain models for the Chainmail messaging overlay.
//!
//! Conversations are keyed by wallet addresses (and optionally by NFT
//! contract/token identity).  The structs here mirror the upstream REST API
//! at the wire boundary and provide the normalized, snake_case shapes the
//! rest of the workspace works with.

pub mod address;
pub mod chain;
pub mod inbox;
pub mod message;
pub mod metadata;
pub mod projection;

mod error;

pub use address::Address;
pub use chain::Chain;
pub use error::TypeError;
pub use inbox::InboxSnapshot;
pub use message::{ChatContext, MessageKey, MessageRecord, NewChatItem};
pub use metadata::{CollectionInfo, NftMetadata, SubjectKey};
pub use projection::{Position, ProjectedMessage};
