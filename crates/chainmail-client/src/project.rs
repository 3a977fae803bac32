//! Conversation projection.
//!
//! Maps authoritative records into position-annotated entries relative to
//! the viewing account.  Ordering follows the source list; the projector
//! never re-sorts.  Records that do not involve the account, or that lack
//! an address entirely, are dropped rather than surfaced.

use tracing::debug;

use chainmail_types::{Address, MessageRecord, Position, ProjectedMessage};

use crate::resolver::ContentResolver;

/// The side `record` renders on for `account`, or `None` when the record
/// must be dropped (malformed or foreign).
pub fn position_for(record: &MessageRecord, account: &Address) -> Option<Position> {
    if record.from_addr.is_empty() || record.to_addr.is_empty() {
        return None;
    }
    if &record.to_addr == account {
        Some(Position::Left)
    } else if &record.from_addr == account {
        Some(Position::Right)
    } else {
        None
    }
}

/// Project `records` for `account`, expanding bodies from the resolver's
/// memo.  A body not yet resolved projects as `message: None` with
/// `resolving: true`; the caller re-projects once resolution completes.
pub fn project(
    records: &[MessageRecord],
    account: &Address,
    resolver: &ContentResolver,
) -> Vec<ProjectedMessage> {
    let mut projected = Vec::with_capacity(records.len());

    for record in records {
        let Some(position) = position_for(record, account) else {
            debug!(
                from = %record.from_addr,
                to = %record.to_addr,
                "dropping malformed or foreign record"
            );
            continue;
        };

        let message = resolver.cached(&record.content_pointer);
        let resolving = message.is_none();

        projected.push(ProjectedMessage {
            id: record.id,
            message,
            from_addr: record.from_addr.clone(),
            to_addr: record.to_addr.clone(),
            timestamp: record.timestamp,
            read: record.read,
            position,
            resolving,
            nft_addr: record.nft_addr.clone(),
            nft_id: record.nft_id,
        });
    }

    projected
}

/// Fold a server-confirmed read update back into the projection.
///
/// Matches by the stable record key (server id when present), not by
/// timestamp alone.  Returns true when an entry was reconciled.
pub fn reconcile_read(messages: &mut [ProjectedMessage], server: &MessageRecord) -> bool {
    for entry in messages.iter_mut() {
        if entry.matches(server) {
            entry.read = server.read;
            return true;
        }
    }
    false
}
