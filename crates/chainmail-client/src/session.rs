//! Session composition.
//!
//! A [`ChatSession`] wires the transport, resolver, synchronizer, metadata
//! service and read tracker together for one account.  On account change
//! the embedder drops the session (cancelling its poll handle) and builds a
//! fresh one; nothing in here survives across accounts, which is what makes
//! late-arriving responses for the old account harmless.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use tracing::info;

use chainmail_api::{ApiError, ContentStore, HttpApi, InboxApi, IpfsStore};
use chainmail_store::CacheStore;
use chainmail_types::{
    Address, Chain, InboxSnapshot, MessageRecord, NewChatItem, Position, ProjectedMessage,
};

use crate::config::ClientConfig;
use crate::error::{MetadataError, ReadError};
use crate::metadata::{MetadataResolution, MetadataService};
use crate::project;
use crate::read_state::ReadStateTracker;
use crate::resolver::ContentResolver;
use crate::scheduler::ScheduleHandle;
use crate::sync::{InboxSynchronizer, PollOutcome};

/// One account's view of the messaging overlay.
pub struct ChatSession {
    account: Address,
    api: Arc<dyn InboxApi>,
    content: Arc<dyn ContentStore>,
    resolver: ContentResolver,
    metadata: MetadataService,
    sync: Arc<InboxSynchronizer>,
    tracker: ReadStateTracker,
    poll_interval: Duration,
}

impl ChatSession {
    /// Build a production session from configuration.
    pub fn new(config: &ClientConfig, account: Address, store: Arc<CacheStore>) -> Self {
        let api: Arc<dyn InboxApi> = Arc::new(HttpApi::new(config.rest_api_url.clone()));
        let content: Arc<dyn ContentStore> = Arc::new(IpfsStore::new(
            config.ipfs_api_url.clone(),
            config.ipfs_gateway_url.clone(),
        ));
        let metadata = MetadataService::from_config(config);

        Self::with_parts(account, api, content, store, metadata, config.poll_interval)
    }

    /// Build a session from explicit collaborators (tests, embedders).
    pub fn with_parts(
        account: Address,
        api: Arc<dyn InboxApi>,
        content: Arc<dyn ContentStore>,
        store: Arc<CacheStore>,
        metadata: MetadataService,
        poll_interval: Duration,
    ) -> Self {
        info!(account = %account.short(), "starting chat session");

        Self {
            account: account.clone(),
            resolver: ContentResolver::new(content.clone()),
            sync: Arc::new(InboxSynchronizer::new(api.clone(), store)),
            tracker: ReadStateTracker::new(api.clone()),
            api,
            content,
            metadata,
            poll_interval,
        }
    }

    pub fn account(&self) -> &Address {
        &self.account
    }

    /// Start the inbox poll loop.  Cancel the handle on teardown.
    pub fn start_polling(&self) -> ScheduleHandle {
        self.sync.start(self.account.clone(), self.poll_interval)
    }

    /// The current inbox snapshot (instant, possibly from the durable cache
    /// when no poll has completed yet).
    pub fn inbox(&self) -> InboxSnapshot {
        self.sync.snapshot()
    }

    pub fn inbox_fetch_failed(&self) -> bool {
        self.sync.fetch_failed()
    }

    /// One manual poll cycle (the loop does this automatically).
    pub async fn poll_inbox(&self) -> Result<PollOutcome, crate::error::SyncError> {
        self.sync.poll(&self.account).await
    }

    /// Fetch, resolve and project the conversation with `counterparty`.
    ///
    /// Bodies that fail to resolve project as pending rather than failing
    /// the whole conversation.
    pub async fn conversation(
        &self,
        counterparty: &Address,
    ) -> Result<Vec<ProjectedMessage>, ApiError> {
        let records = self.api.get_chat_items(&self.account).await?;

        let records: Vec<MessageRecord> = records
            .into_iter()
            .filter(|r| r.involves(&self.account))
            .filter(|r| {
                &r.from_addr == counterparty || &r.to_addr == counterparty
            })
            .collect();

        self.resolve_bodies(&records).await;
        Ok(project::project(&records, &self.account, &self.resolver))
    }

    /// Send a message: store the body, then create the record carrying the
    /// returned pointer.  Returns the server's echo of the created record.
    pub async fn send(&self, to: &Address, body: &str) -> Result<MessageRecord, ApiError> {
        let pointer = self.content.store(body).await?;

        // The body is already known; no need to round-trip our own message
        // through the gateway on the next projection.
        self.resolver.prime(&pointer, body);

        let item = NewChatItem {
            content_pointer: pointer,
            from_addr: self.account.clone(),
            to_addr: to.clone(),
            timestamp: Utc::now(),
            read: false,
        };

        let created = self.api.create_chat_item(&item).await?;
        info!(to = %to.short(), "message sent");
        Ok(created)
    }

    /// The optimistic projection for a message the user just submitted,
    /// rendered `right` and resolving until [`ChatSession::send`] lands.
    pub fn optimistic_send(&self, to: &Address, body: &str) -> ProjectedMessage {
        ProjectedMessage {
            id: None,
            message: Some(body.to_string()),
            from_addr: self.account.clone(),
            to_addr: to.clone(),
            timestamp: Utc::now(),
            read: false,
            position: Position::Right,
            resolving: true,
            nft_addr: None,
            nft_id: None,
        }
    }

    /// Feed a visibility observation for `record` and, when a read write
    /// lands, reconcile the server's record into `messages`.
    ///
    /// Returns true when the projection changed.
    pub async fn mark_visible(
        &self,
        messages: &mut [ProjectedMessage],
        record: &MessageRecord,
        visible: bool,
    ) -> Result<bool, ReadError> {
        match self.tracker.observe(&self.account, record, visible).await? {
            Some(server_record) => Ok(project::reconcile_read(messages, &server_record)),
            None => Ok(false),
        }
    }

    /// Resolve NFT metadata for a conversation subject, with the session's
    /// account as viewer.
    pub async fn resolve_nft(
        &self,
        chain: Chain,
        contract: &Address,
        token_id: i64,
    ) -> Result<MetadataResolution, MetadataError> {
        self.metadata
            .resolve(chain, contract, token_id, &self.account)
            .await
    }

    pub fn metadata(&self) -> &MetadataService {
        &self.metadata
    }

    /// Kick off resolution for every pointer in `records`, ignoring
    /// individual failures (they project as pending and retry next pass).
    async fn resolve_bodies(&self, records: &[MessageRecord]) {
        let mut pointers: Vec<&str> = records
            .iter()
            .map(|r| r.content_pointer.as_str())
            .collect();
        pointers.sort_unstable();
        pointers.dedup();

        join_all(
            pointers
                .into_iter()
                .map(|pointer| self.resolver.resolve(pointer)),
        )
        .await;
    }
}
