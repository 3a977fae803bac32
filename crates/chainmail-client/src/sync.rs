//! Periodic inbox synchronization.
//!
//! Every poll fetches the authoritative conversation list, normalizes a
//! `null` body to the empty list, and diffs the resulting snapshot
//! structurally against the snapshot held *at completion time* (a tick may
//! fire while a previous request is still outstanding, so captured state
//! must never be diffed against).  Only a real difference commits: the
//! durable slot first, then memory, so the two views never diverge and a
//! cold start renders from last-known-good state before the first round
//! trip completes.  A failed slot write leaves both views on the old
//! snapshot; the next tick re-diffs and retries the write.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, info, warn};

use chainmail_api::InboxApi;
use chainmail_store::InboxCache;
use chainmail_types::{Address, InboxSnapshot};

use crate::error::SyncError;
use crate::scheduler::{schedule, ScheduleHandle};

/// What a completed poll did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The fetched list differed; snapshot committed and persisted.
    Updated,
    /// Structurally identical to the current snapshot; nothing written.
    Unchanged,
}

struct SyncState {
    snapshot: InboxSnapshot,
    fetch_failed: bool,
}

/// Owner of the in-memory inbox snapshot and its durable mirror.
pub struct InboxSynchronizer {
    api: Arc<dyn InboxApi>,
    store: Arc<dyn InboxCache>,
    state: Mutex<SyncState>,
}

impl InboxSynchronizer {
    /// Build a synchronizer, seeding the snapshot from the durable slot if
    /// one was persisted by an earlier run.
    pub fn new(api: Arc<dyn InboxApi>, store: Arc<dyn InboxCache>) -> Self {
        let snapshot = store.load_inbox().unwrap_or_default();
        if !snapshot.is_empty() {
            info!(entries = snapshot.len(), "seeded inbox from durable cache");
        }

        Self {
            api,
            store,
            state: Mutex::new(SyncState {
                snapshot,
                fetch_failed: false,
            }),
        }
    }

    /// The current snapshot.  Always available; possibly stale, never torn.
    pub fn snapshot(&self) -> InboxSnapshot {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .snapshot
            .clone()
    }

    /// True when the most recent poll failed.  Cleared by the next success.
    pub fn fetch_failed(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .fetch_failed
    }

    /// One poll cycle for `account`.
    ///
    /// Failures raise the fetching-failed flag and retain the current
    /// snapshot; the caller's next tick is the retry policy.
    pub async fn poll(&self, account: &Address) -> Result<PollOutcome, SyncError> {
        let fetched = match self.api.get_inbox(account).await {
            Ok(records) => records,
            Err(e) => {
                warn!(account = %account.short(), error = %e, "inbox poll failed");
                self.state
                    .lock()
                    .unwrap_or_else(|l| l.into_inner())
                    .fetch_failed = true;
                return Err(e.into());
            }
        };

        let snapshot = InboxSnapshot::new(account, fetched.unwrap_or_default());

        // Diff against whatever the snapshot is *now*, not what it was when
        // this poll started.  The slot write happens before the memory
        // commit: if it fails, memory still holds the old snapshot and the
        // next tick sees the difference again and retries the write.
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.fetch_failed = false;

        if snapshot == state.snapshot {
            debug!(account = %account.short(), "inbox unchanged");
            return Ok(PollOutcome::Unchanged);
        }

        self.store.save_inbox(&snapshot)?;
        info!(
            account = %account.short(),
            entries = snapshot.len(),
            "inbox snapshot accepted"
        );
        state.snapshot = snapshot;
        Ok(PollOutcome::Updated)
    }

    /// Start the poll loop for `account`: one immediate poll, then one per
    /// `interval`.  Cancel the returned handle on teardown or account
    /// change (and build a fresh loop for the new account).
    pub fn start(self: &Arc<Self>, account: Address, interval: Duration) -> ScheduleHandle {
        let sync = Arc::clone(self);
        schedule(interval, move || {
            let sync = Arc::clone(&sync);
            let account = account.clone();
            async move {
                // Errors are already logged and flagged; the loop never dies.
                let _ = sync.poll(&account).await;
            }
        })
    }
}
