//! REST client for the off-chain message store.
//!
//! The endpoints are small and historical: `get_inbox` returns one summary
//! row per conversation (or a literal `null` when the account has none),
//! `getall_chatitems` returns every record involving the account, and
//! `update_chatitem` is the only write this engine ever initiates against
//! an existing record (flipping `read` to true).

use async_trait::async_trait;
use tracing::debug;

use chainmail_types::{Address, MessageRecord, NewChatItem};

use crate::error::{ApiError, Result};

/// The opaque request/response collaborator the engine talks to.
///
/// Implemented by [`HttpApi`] in production and by in-memory fakes in the
/// engine's tests.
#[async_trait]
pub trait InboxApi: Send + Sync {
    /// `GET /get_inbox/{account}`.  A `null` body is surfaced as `None` and
    /// normalized to an empty snapshot by the synchronizer.
    async fn get_inbox(&self, account: &Address) -> Result<Option<Vec<MessageRecord>>>;

    /// `GET /getall_chatitems/{account}`.
    async fn get_chat_items(&self, account: &Address) -> Result<Vec<MessageRecord>>;

    /// `POST /create_chatitem`.  Echoes the created record.
    async fn create_chat_item(&self, item: &NewChatItem) -> Result<MessageRecord>;

    /// `PUT /update_chatitem/{fromAddr}/{toAddr}` with the full record.
    /// Returns the updated record as stored server-side.
    async fn update_chat_item(&self, record: &MessageRecord) -> Result<MessageRecord>;
}

/// Production [`InboxApi`] over reqwest.
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

#[async_trait]
impl InboxApi for HttpApi {
    async fn get_inbox(&self, account: &Address) -> Result<Option<Vec<MessageRecord>>> {
        let url = self.url(&format!("get_inbox/{account}"));
        debug!(account = %account.short(), "GET inbox");

        let response = self.client.get(&url).send().await?;
        check_status(&url, &response)?;

        // The server answers `null` for accounts with no conversations.
        let records: Option<Vec<MessageRecord>> = response.json().await?;
        Ok(records)
    }

    async fn get_chat_items(&self, account: &Address) -> Result<Vec<MessageRecord>> {
        let url = self.url(&format!("getall_chatitems/{account}"));
        debug!(account = %account.short(), "GET chat items");

        let response = self.client.get(&url).send().await?;
        check_status(&url, &response)?;

        let records: Option<Vec<MessageRecord>> = response.json().await?;
        Ok(records.unwrap_or_default())
    }

    async fn create_chat_item(&self, item: &NewChatItem) -> Result<MessageRecord> {
        let url = self.url("create_chatitem");
        debug!(
            from = %item.from_addr.short(),
            to = %item.to_addr.short(),
            "POST chat item"
        );

        let response = self.client.post(&url).json(item).send().await?;
        check_status(&url, &response)?;

        Ok(response.json().await?)
    }

    async fn update_chat_item(&self, record: &MessageRecord) -> Result<MessageRecord> {
        let url = self.url(&format!(
            "update_chatitem/{}/{}",
            record.from_addr, record.to_addr
        ));
        debug!(
            from = %record.from_addr.short(),
            to = %record.to_addr.short(),
            "PUT chat item"
        );

        let response = self.client.put(&url).json(record).send().await?;
        check_status(&url, &response)?;

        Ok(response.json().await?)
    }
}

fn check_status(url: &str, response: &reqwest::Response) -> Result<()> {
    let status = response.status();
    if !status.is_success() {
        return Err(ApiError::Status {
            status,
            url: url.to_string(),
        });
    }
    Ok(())
}
