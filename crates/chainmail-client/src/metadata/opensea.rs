//! OpenSea metadata provider (Ethereum mainnet).
//!
//! Primary source for Ethereum tokens.  A payload without a collection
//! name is treated as unrecognized so the chain can fall through, matching
//! how the asset endpoint behaves for unindexed tokens.

use async_trait::async_trait;
use serde::Deserialize;

use chainmail_types::{Address, Chain, CollectionInfo, NftMetadata};

use crate::error::ProviderError;
use crate::metadata::chain::NftProvider;

const DEFAULT_BASE_URL: &str = "https://api.opensea.io/api/v1";

pub struct OpenSeaProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl OpenSeaProvider {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// Raw OpenSea asset payload, reduced to the fields we normalize.
#[derive(Debug, Deserialize)]
struct OpenSeaAsset {
    name: Option<String>,
    image_url: Option<String>,
    collection: Option<OpenSeaCollection>,
}

#[derive(Debug, Deserialize)]
struct OpenSeaCollection {
    name: Option<String>,
    image_url: Option<String>,
}

fn normalize(
    asset: OpenSeaAsset,
    contract: &Address,
    token_id: i64,
) -> Result<NftMetadata, ProviderError> {
    // No collection name means OpenSea has not really indexed this token.
    let collection_name = asset
        .collection
        .as_ref()
        .and_then(|c| c.name.clone())
        .ok_or(ProviderError::UnrecognizedPayload)?;

    Ok(NftMetadata {
        address: contract.clone(),
        token_id,
        chain: Chain::Ethereum,
        name: asset.name,
        image_url: asset.image_url,
        collection: Some(CollectionInfo {
            name: collection_name,
            image_url: asset.collection.and_then(|c| c.image_url),
        }),
        floor_price: None,
    })
}

#[async_trait]
impl NftProvider for OpenSeaProvider {
    fn name(&self) -> &'static str {
        "opensea"
    }

    fn chain(&self) -> Chain {
        Chain::Ethereum
    }

    fn configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn fetch(
        &self,
        contract: &Address,
        token_id: i64,
        viewer: &Address,
    ) -> Result<NftMetadata, ProviderError> {
        // `configured()` is checked by the chain; an empty key here would
        // only produce a 401, which falls through like any other failure.
        let key = self.api_key.as_deref().unwrap_or_default();
        let url = format!(
            "{}/asset/{contract}/{token_id}?account_address={viewer}",
            self.base_url
        );

        let response = self
            .client
            .get(&url)
            .header("Authorization", key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status));
        }

        let asset: OpenSeaAsset = response.json().await?;
        normalize(asset, contract, token_id)
    }
}
