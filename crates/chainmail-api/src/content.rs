//! Content-addressed body store.
//!
//! Message records never carry their text inline; they carry an opaque
//! pointer into an IPFS-style store.  `get` is idempotent by construction
//! (the pointer *is* the content hash), which is what makes memoizing
//! resolution safe.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::error::{ApiError, Result};

/// Opaque get/put of text by pointer.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Resolve a pointer to the stored text.
    async fn fetch(&self, pointer: &str) -> Result<String>;

    /// Store `text` and return the pointer to reference it by.
    async fn store(&self, text: &str) -> Result<String>;
}

/// [`ContentStore`] backed by an IPFS HTTP API (writes) and gateway (reads).
#[derive(Debug, Clone)]
pub struct IpfsStore {
    client: reqwest::Client,
    /// HTTP API endpoint used for `add`, e.g. `https://ipfs.infura.io:5001`.
    api_url: String,
    /// Gateway used for reads, e.g. `https://ipfs.infura.io/ipfs`.
    gateway_url: String,
}

#[derive(Debug, Deserialize)]
struct AddResponse {
    #[serde(rename = "Hash")]
    hash: String,
}

impl IpfsStore {
    pub fn new(api_url: impl Into<String>, gateway_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            gateway_url: gateway_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn gateway(&self, pointer: &str) -> String {
        format!("{}/{}", self.gateway_url, pointer)
    }
}

#[async_trait]
impl ContentStore for IpfsStore {
    async fn fetch(&self, pointer: &str) -> Result<String> {
        let url = self.gateway(pointer);
        debug!(pointer, "fetching content");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status { status, url });
        }

        Ok(response.text().await?)
    }

    async fn store(&self, text: &str) -> Result<String> {
        let url = format!("{}/api/v0/add", self.api_url);
        debug!(bytes = text.len(), "storing content");

        let part = reqwest::multipart::Part::text(text.to_string()).file_name("body");
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self.client.post(&url).multipart(form).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status { status, url });
        }

        let parsed: AddResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(parsed.hash)
    }
}
