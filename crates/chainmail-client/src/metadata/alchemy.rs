//! Alchemy metadata provider (Ethereum fallback, Polygon primary).
//!
//! One instance serves one chain; the production chain holds two of them
//! with per-chain API keys.  Alchemy nests its collection data under
//! `contractMetadata.openSea`, which also carries the only floor price we
//! get for free.

use async_trait::async_trait;
use serde::Deserialize;

use chainmail_types::{Address, Chain, CollectionInfo, NftMetadata};

use crate::error::ProviderError;
use crate::metadata::chain::NftProvider;

pub struct AlchemyProvider {
    client: reqwest::Client,
    chain: Chain,
    api_key: Option<String>,
}

impl AlchemyProvider {
    pub fn new(chain: Chain, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            chain,
            api_key,
        }
    }

    fn base_url(&self) -> &'static str {
        match self.chain {
            Chain::Ethereum => "https://eth-mainnet.g.alchemy.com/v2",
            Chain::Polygon => "https://polygon-mainnet.g.alchemy.com/v2",
        }
    }
}

/// Raw `getNFTMetadata` payload, reduced to the fields we normalize.
#[derive(Debug, Deserialize)]
struct AlchemyNft {
    title: Option<String>,
    media: Option<Vec<AlchemyMedia>>,
    metadata: Option<AlchemyTokenMetadata>,
    #[serde(rename = "contractMetadata")]
    contract_metadata: Option<AlchemyContractMetadata>,
}

#[derive(Debug, Deserialize)]
struct AlchemyMedia {
    gateway: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AlchemyTokenMetadata {
    image: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AlchemyContractMetadata {
    name: Option<String>,
    #[serde(rename = "openSea")]
    open_sea: Option<AlchemyOpenSea>,
}

#[derive(Debug, Deserialize)]
struct AlchemyOpenSea {
    #[serde(rename = "collectionName")]
    collection_name: Option<String>,
    #[serde(rename = "imageUrl")]
    image_url: Option<String>,
    #[serde(rename = "floorPrice")]
    floor_price: Option<f64>,
}

fn normalize(
    nft: AlchemyNft,
    contract: &Address,
    token_id: i64,
    chain: Chain,
) -> Result<NftMetadata, ProviderError> {
    let contract_meta = nft.contract_metadata.as_ref();
    let open_sea = contract_meta.and_then(|c| c.open_sea.as_ref());

    // Collection name: the openSea block when present, otherwise the
    // contract name.  Neither present means the payload is unusable.
    let collection_name = open_sea
        .and_then(|o| o.collection_name.clone())
        .or_else(|| contract_meta.and_then(|c| c.name.clone()))
        .ok_or(ProviderError::UnrecognizedPayload)?;

    let image_url = nft
        .media
        .as_ref()
        .and_then(|m| m.first())
        .and_then(|m| m.gateway.clone())
        .or_else(|| nft.metadata.as_ref().and_then(|m| m.image.clone()));

    Ok(NftMetadata {
        address: contract.clone(),
        token_id,
        chain,
        name: nft.title.filter(|t| !t.is_empty()),
        image_url,
        collection: Some(CollectionInfo {
            name: collection_name,
            image_url: open_sea.and_then(|o| o.image_url.clone()),
        }),
        floor_price: open_sea.and_then(|o| o.floor_price),
    })
}

#[async_trait]
impl NftProvider for AlchemyProvider {
    fn name(&self) -> &'static str {
        match self.chain {
            Chain::Ethereum => "alchemy-ethereum",
            Chain::Polygon => "alchemy-polygon",
        }
    }

    fn chain(&self) -> Chain {
        self.chain
    }

    fn configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn fetch(
        &self,
        contract: &Address,
        token_id: i64,
        _viewer: &Address,
    ) -> Result<NftMetadata, ProviderError> {
        let key = self.api_key.as_deref().unwrap_or_default();
        let url = format!(
            "{}/{key}/getNFTMetadata?contractAddress={contract}&tokenId={token_id}",
            self.base_url()
        );

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status));
        }

        let nft: AlchemyNft = response.json().await?;
        normalize(nft, contract, token_id, self.chain)
    }
}
