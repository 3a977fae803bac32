//! UI-facing message projection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::message::{MessageKey, MessageRecord};

/// Which side of the conversation a message renders on, relative to the
/// viewing account.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Left,
    Right,
}

/// A message prepared for rendering: body resolved (or pending), side
/// assigned, wire field names normalized.
///
/// Rebuilt from the authoritative records on every sync; owned exclusively
/// by the projector and mutated only through explicit reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectedMessage {
    /// Server row id, when the record carries one.
    pub id: Option<i64>,

    /// Resolved message body.  `None` while content resolution is pending.
    pub message: Option<String>,

    pub from_addr: Address,
    pub to_addr: Address,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
    pub position: Position,

    /// True while the body (or an in-flight send) is still being resolved.
    pub resolving: bool,

    pub nft_addr: Option<Address>,
    pub nft_id: Option<i64>,
}

impl ProjectedMessage {
    /// Reconciliation key, mirroring [`MessageRecord::key`].
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

    /// True when this projection corresponds to `record` as returned by the
    /// server (used when reconciling a read-state write).
    pub fn matches(&self, record: &MessageRecord) -> bool {
        self.key() == record.key()
    }
}
