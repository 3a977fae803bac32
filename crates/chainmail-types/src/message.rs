//! Authoritative message records as served by the REST store.
//!
//! The wire format is historical and inconsistent: reads return lowercase
//! `fromaddr`/`toaddr` field names, while the create payload uses camelCase
//! `fromAddr`/`toAddr`.  Both shapes are pinned here with explicit serde
//! renames so nothing else in the workspace has to know.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::address::Address;

/// Which kind of conversation a record belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChatContext {
    #[default]
    Dm,
    Nft,
    Community,
}

impl ChatContext {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dm => "dm",
            Self::Nft => "nft",
            Self::Community => "community",
        }
    }
}

impl std::fmt::Display for ChatContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single message as owned by the server.
///
/// Immutable once created except for `read`, which transitions only
/// `false -> true` (and only via the read-state tracker).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageRecord {
    /// Server-assigned row id.  Older records may lack one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,

    /// Opaque content pointer (e.g. an IPFS CID).  The actual body lives in
    /// the content-addressed store and is resolved lazily.
    #[serde(rename = "message")]
    pub content_pointer: String,

    #[serde(rename = "fromaddr", default, deserialize_with = "de_addr")]
    pub from_addr: Address,

    #[serde(rename = "toaddr", default, deserialize_with = "de_addr")]
    pub to_addr: Address,

    pub timestamp: DateTime<Utc>,

    pub read: bool,

    #[serde(rename = "context_type", default)]
    pub context: ChatContext,

    /// Chain slug as served by the inbox endpoint.  `"none"` for non-NFT
    /// conversations, hence a raw string rather than a [`crate::Chain`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain: Option<String>,

    #[serde(rename = "nftaddr", default, skip_serializing_if = "Option::is_none")]
    pub nft_addr: Option<Address>,

    #[serde(rename = "nftid", default, skip_serializing_if = "Option::is_none")]
    pub nft_id: Option<i64>,
}

impl MessageRecord {
    /// True when `account` is the sender or the recipient.
    pub fn involves(&self, account: &Address) -> bool {
        &self.from_addr == account || &self.to_addr == account
    }

    /// The other end of the conversation relative to `account`, or `None`
    /// for records that do not involve the account at all.
    pub fn counterparty(&self, account: &Address) -> Option<&Address> {
        if &self.from_addr == account {
            Some(&self.to_addr)
        } else if &self.to_addr == account {
            Some(&self.from_addr)
        } else {
            None
        }
    }

    /// Stable key used to reconcile a server response against the local
    /// projection.  Prefers the server-assigned id; falls back to the
    /// address pair plus timestamp for legacy rows without one.
    pub fn key(&self) -> MessageKey {
        match self.id {
            Some(id) => MessageKey::Id(id),
            None => MessageKey::Addressed {
                from: self.from_addr.clone(),
                to: self.to_addr.clone(),
                timestamp: self.timestamp,
            },
        }
    }
}

/// Reconciliation key for a [`MessageRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MessageKey {
    Id(i64),
    Addressed {
        from: Address,
        to: Address,
        timestamp: DateTime<Utc>,
    },
}

/// Payload for `POST /create_chatitem`.
///
/// Note the camelCase address fields; the upstream create endpoint predates
/// the lowercase read shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewChatItem {
    #[serde(rename = "message")]
    pub content_pointer: String,

    #[serde(rename = "fromAddr")]
    pub from_addr: Address,

    #[serde(rename = "toAddr")]
    pub to_addr: Address,

    pub timestamp: DateTime<Utc>,

    pub read: bool,
}

/// Addresses may be missing or `null` on legacy rows; treat both as empty
/// and let the projector drop the record.
fn de_addr<'de, D>(deserializer: D) -> Result<Address, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(Address::new(raw.unwrap_or_default()))
}
