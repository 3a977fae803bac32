//! The inbox snapshot: the full, replaced-not-merged state of the inbox as
//! of one accepted poll.

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::message::{ChatContext, MessageRecord};

/// Ordered collection of per-conversation summary records, one per
/// counterparty/subject.
///
/// Snapshots are compared structurally: the synchronizer only commits (and
/// persists) a freshly fetched snapshot when it differs from the current one,
/// so `PartialEq` here is the sole churn gate for the whole inbox path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct InboxSnapshot {
    entries: Vec<MessageRecord>,
}

impl InboxSnapshot {
    /// Build a snapshot from a fetched record list, preserving server order.
    ///
    /// The server is expected to return one summary row per conversation,
    /// but the invariant (no two entries for the same counterparty+context
    /// tuple) is enforced here rather than trusted: later duplicates are
    /// dropped.
    pub fn new(account: &Address, records: Vec<MessageRecord>) -> Self {
        let mut seen: Vec<EntryKey> = Vec::with_capacity(records.len());
        let mut entries = Vec::with_capacity(records.len());

        for record in records {
            let key = EntryKey::of(account, &record);
            if seen.contains(&key) {
                continue;
            }
            seen.push(key);
            entries.push(record);
        }

        Self { entries }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[MessageRecord] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// NFT-context entries, excluding rows whose chain slug is `"none"`,
    /// optionally narrowed to a set of chain slugs.
    ///
    /// An empty filter list means "all chains".
    pub fn nft_entries(&self, chain_slugs: &[&str]) -> Vec<&MessageRecord> {
        self.entries
            .iter()
            .filter(|e| e.context == ChatContext::Nft)
            .filter(|e| e.chain.as_deref().map_or(false, |c| c != "none"))
            .filter(|e| {
                chain_slugs.is_empty()
                    || e.chain
                        .as_deref()
                        .map_or(false, |c| chain_slugs.contains(&c))
            })
            .collect()
    }
}

/// Dedup key: counterparty + context + NFT subject.
#[derive(Debug, Clone, PartialEq)]
struct EntryKey {
    counterparty: Option<Address>,
    context: ChatContext,
    nft_addr: Option<Address>,
    nft_id: Option<i64>,
}

impl EntryKey {
    fn of(account: &Address, record: &MessageRecord) -> Self {
        Self {
            counterparty: record.counterparty(account).cloned(),
            context: record.context,
            nft_addr: record.nft_addr.clone(),
            nft_id: record.nft_id,
        }
    }
}
