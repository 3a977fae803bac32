//! Read-state tracking.
//!
//! Per rendered message the tracker runs a small state machine:
//!
//! `Unread -> (visible AND addressed-to-viewer AND not already read)
//!         -> PendingWrite -> Read`
//!
//! Visibility is a plain boolean input supplied by whatever viewport logic
//! the embedder has; the tracker itself is transport-driven state, not a UI
//! callback.  The write carries the full record with `read: true`; the
//! server's echoed record is handed back for reconciliation so server-side
//! adjustments are honored instead of blindly flipping the local flag.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use chainmail_api::InboxApi;
use chainmail_types::{Address, MessageKey, MessageRecord};

use crate::error::ReadError;

/// Where a message currently sits in the read transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadPhase {
    #[default]
    Unread,
    PendingWrite,
    Read,
}

/// Pure transition predicate: should a visibility event fire the write?
///
/// A message authored by the viewing account never transitions, no matter
/// how visible it is; senders do not mark their own messages read.
pub fn should_mark(record: &MessageRecord, account: &Address, visible: bool) -> bool {
    visible && !record.read && &record.to_addr == account && &record.from_addr != account
}

/// Issues read writes and tracks per-message transition phase.
pub struct ReadStateTracker {
    api: Arc<dyn InboxApi>,
    phases: Mutex<HashMap<MessageKey, ReadPhase>>,
}

impl ReadStateTracker {
    pub fn new(api: Arc<dyn InboxApi>) -> Self {
        Self {
            api,
            phases: Mutex::new(HashMap::new()),
        }
    }

    /// The tracked phase for a record (messages the tracker has never acted
    /// on report `Unread`).
    pub fn phase(&self, record: &MessageRecord) -> ReadPhase {
        self.phases
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&record.key())
            .copied()
            .unwrap_or_default()
    }

    /// Feed one visibility observation for `record`.
    ///
    /// Returns the server's updated record when a write completed (the
    /// caller reconciles it into the projection), `None` when no transition
    /// fired.  A failed write reverts to `Unread` so the next visibility
    /// event retries.
    pub async fn observe(
        &self,
        account: &Address,
        record: &MessageRecord,
        visible: bool,
    ) -> Result<Option<MessageRecord>, ReadError> {
        if !should_mark(record, account, visible) {
            return Ok(None);
        }

        let key = record.key();
        {
            let mut phases = self.phases.lock().unwrap_or_else(|e| e.into_inner());
            match phases.get(&key) {
                // Already written, or a write is in flight.
                Some(ReadPhase::Read) | Some(ReadPhase::PendingWrite) => return Ok(None),
                _ => {
                    phases.insert(key.clone(), ReadPhase::PendingWrite);
                }
            }
        }

        let mut updated = record.clone();
        updated.read = true;

        match self.api.update_chat_item(&updated).await {
            Ok(server_record) => {
                debug!(
                    from = %record.from_addr.short(),
                    to = %record.to_addr.short(),
                    "message marked read"
                );
                self.phases
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .insert(key, ReadPhase::Read);
                Ok(Some(server_record))
            }
            Err(e) => {
                warn!(error = %e, "read-state write failed");
                self.phases
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .remove(&key);
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chainmail_api::ApiError;
    use chainmail_types::{ChatContext, NewChatItem};

    /// Records update calls; optionally fails the first N of them.
    struct RecordingApi {
        updates: Mutex<Vec<MessageRecord>>,
        fail_next: AtomicUsize,
    }

    impl RecordingApi {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                updates: Mutex::new(Vec::new()),
                fail_next: AtomicUsize::new(0),
            })
        }

        fn failing(n: usize) -> Arc<Self> {
            let api = Self::new();
            api.fail_next.store(n, Ordering::SeqCst);
            api
        }

        fn update_count(&self) -> usize {
            self.updates.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl InboxApi for RecordingApi {
        async fn get_inbox(
            &self,
            _account: &Address,
        ) -> chainmail_api::Result<Option<Vec<MessageRecord>>> {
            unimplemented!("not used by read-state tests")
        }

        async fn get_chat_items(
            &self,
            _account: &Address,
        ) -> chainmail_api::Result<Vec<MessageRecord>> {
            unimplemented!("not used by read-state tests")
        }

        async fn create_chat_item(
            &self,
            _item: &NewChatItem,
        ) -> chainmail_api::Result<MessageRecord> {
            unimplemented!("not used by read-state tests")
        }

        async fn update_chat_item(
            &self,
            record: &MessageRecord,
        ) -> chainmail_api::Result<MessageRecord> {
            if self
                .fail_next
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(ApiError::Decode("write refused".into()));
            }
            self.updates.lock().unwrap().push(record.clone());
            Ok(record.clone())
        }
    }

    fn record(id: i64, from: &str, to: &str, read: bool) -> MessageRecord {
        MessageRecord {
            id: Some(id),
            content_pointer: format!("Qm{id}"),
            from_addr: Address::new(from),
            to_addr: Address::new(to),
            timestamp: "2022-06-01T12:00:00Z".parse().unwrap(),
            read,
            context: ChatContext::Dm,
            chain: None,
            nft_addr: None,
            nft_id: None,
        }
    }

    #[tokio::test]
    async fn visible_unread_inbound_message_is_marked() {
        let api = RecordingApi::new();
        let tracker = ReadStateTracker::new(api.clone());
        let account = Address::new("0xme");
        let msg = record(1, "0xalice", "0xme", false);

        let result = tracker.observe(&account, &msg, true).await.unwrap();
        let server = result.expect("write should have fired");
        assert!(server.read);
        assert_eq!(tracker.phase(&msg), ReadPhase::Read);

        // The write carried the full record with read=true.
        assert_eq!(api.update_count(), 1);
        assert!(api.updates.lock().unwrap()[0].read);
    }

    #[tokio::test]
    async fn self_sent_messages_are_never_marked() {
        let api = RecordingApi::new();
        let tracker = ReadStateTracker::new(api.clone());
        let account = Address::new("0xa");
        // Authored by the viewer, addressed to someone else.
        let msg = record(1, "0xa", "0xb", false);

        let result = tracker.observe(&account, &msg, true).await.unwrap();
        assert!(result.is_none());
        assert_eq!(api.update_count(), 0);
        assert_eq!(tracker.phase(&msg), ReadPhase::Unread);
    }

    #[tokio::test]
    async fn invisible_or_already_read_messages_are_skipped() {
        let api = RecordingApi::new();
        let tracker = ReadStateTracker::new(api.clone());
        let account = Address::new("0xme");

        let unseen = record(1, "0xalice", "0xme", false);
        assert!(tracker
            .observe(&account, &unseen, false)
            .await
            .unwrap()
            .is_none());

        let already_read = record(2, "0xalice", "0xme", true);
        assert!(tracker
            .observe(&account, &already_read, true)
            .await
            .unwrap()
            .is_none());

        assert_eq!(api.update_count(), 0);
    }

    #[tokio::test]
    async fn repeat_observations_write_only_once() {
        let api = RecordingApi::new();
        let tracker = ReadStateTracker::new(api.clone());
        let account = Address::new("0xme");
        let msg = record(1, "0xalice", "0xme", false);

        assert!(tracker.observe(&account, &msg, true).await.unwrap().is_some());
        assert!(tracker.observe(&account, &msg, true).await.unwrap().is_none());
        assert!(tracker.observe(&account, &msg, true).await.unwrap().is_none());

        assert_eq!(api.update_count(), 1);
    }

    #[tokio::test]
    async fn failed_write_reverts_and_next_event_retries() {
        let api = RecordingApi::failing(1);
        let tracker = ReadStateTracker::new(api.clone());
        let account = Address::new("0xme");
        let msg = record(1, "0xalice", "0xme", false);

        assert!(tracker.observe(&account, &msg, true).await.is_err());
        assert_eq!(tracker.phase(&msg), ReadPhase::Unread);

        // Next visibility event succeeds.
        let result = tracker.observe(&account, &msg, true).await.unwrap();
        assert!(result.is_some());
        assert_eq!(tracker.phase(&msg), ReadPhase::Read);
        assert_eq!(api.update_count(), 1);
    }
}
