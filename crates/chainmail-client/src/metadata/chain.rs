//! The provider fallback chain.
//!
//! Providers are held in a statically ordered list; selection by chain is a
//! lookup over that list, never runtime type inspection.  An unconfigured
//! provider is skipped outright (it never ran, so there is nothing to fall
//! through *from*); a provider that ran and failed, or whose payload lacked
//! a recognizable collection name, makes the chain fall through to the next
//! configured provider for the same chain.

use async_trait::async_trait;
use tracing::{debug, warn};

use chainmail_types::{Address, Chain, NftMetadata};

use crate::config::ClientConfig;
use crate::error::{MetadataError, ProviderError};
use crate::metadata::alchemy::AlchemyProvider;
use crate::metadata::opensea::OpenSeaProvider;

/// One external metadata source for one chain family.
#[async_trait]
pub trait NftProvider: Send + Sync {
    /// Short name for log lines.
    fn name(&self) -> &'static str;

    /// The chain family this provider services.
    fn chain(&self) -> Chain;

    /// Whether the required credentials/endpoints are present.
    fn configured(&self) -> bool;

    /// Fetch and normalize metadata for one token.
    async fn fetch(
        &self,
        contract: &Address,
        token_id: i64,
        viewer: &Address,
    ) -> Result<NftMetadata, ProviderError>;
}

/// Statically ordered provider list.
pub struct ProviderChain {
    providers: Vec<Box<dyn NftProvider>>,
}

impl ProviderChain {
    pub fn new(providers: Vec<Box<dyn NftProvider>>) -> Self {
        Self { providers }
    }

    /// The production priority order: Ethereum is served by OpenSea first
    /// with Alchemy as fallback; Polygon by Alchemy only.
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(vec![
            Box::new(OpenSeaProvider::new(config.opensea_api_key.clone())),
            Box::new(AlchemyProvider::new(
                Chain::Ethereum,
                config.alchemy_api_key_ethereum.clone(),
            )),
            Box::new(AlchemyProvider::new(
                Chain::Polygon,
                config.alchemy_api_key_polygon.clone(),
            )),
        ])
    }

    /// Try each configured provider for `chain` in priority order.
    pub async fn fetch(
        &self,
        chain: Chain,
        contract: &Address,
        token_id: i64,
        viewer: &Address,
    ) -> Result<NftMetadata, MetadataError> {
        for provider in self.providers.iter().filter(|p| p.chain() == chain) {
            if !provider.configured() {
                debug!(provider = provider.name(), "provider unconfigured, skipping");
                continue;
            }

            match provider.fetch(contract, token_id, viewer).await {
                Ok(metadata) => {
                    debug!(
                        provider = provider.name(),
                        contract = %contract.short(),
                        token_id,
                        "metadata resolved"
                    );
                    return Ok(metadata);
                }
                Err(e) => {
                    warn!(
                        provider = provider.name(),
                        contract = %contract.short(),
                        token_id,
                        error = %e,
                        "provider failed, falling through"
                    );
                }
            }
        }

        Err(MetadataError::AllProvidersFailed { chain })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use chainmail_types::CollectionInfo;

    /// Scripted provider for chain tests.  The call counter is shared so a
    /// test can keep a handle after the provider moves into the chain.
    pub(crate) struct FakeProvider {
        pub name: &'static str,
        pub chain: Chain,
        pub configured: bool,
        pub result: Result<NftMetadata, ()>,
        pub calls: Arc<AtomicUsize>,
    }

    impl FakeProvider {
        pub fn ok(name: &'static str, chain: Chain, metadata: NftMetadata) -> Self {
            Self {
                name,
                chain,
                configured: true,
                result: Ok(metadata),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        pub fn unrecognized(name: &'static str, chain: Chain) -> Self {
            Self {
                name,
                chain,
                configured: true,
                result: Err(()),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        pub fn unconfigured(name: &'static str, chain: Chain) -> Self {
            Self {
                name,
                chain,
                configured: false,
                result: Err(()),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl NftProvider for FakeProvider {
        fn name(&self) -> &'static str {
            self.name
        }

        fn chain(&self) -> Chain {
            self.chain
        }

        fn configured(&self) -> bool {
            self.configured
        }

        async fn fetch(
            &self,
            _contract: &Address,
            _token_id: i64,
            _viewer: &Address,
        ) -> Result<NftMetadata, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result
                .clone()
                .map_err(|_| ProviderError::UnrecognizedPayload)
        }
    }

    pub(crate) fn sample_metadata(name: &str) -> NftMetadata {
        NftMetadata {
            address: Address::new("0xc0ffee"),
            token_id: 7,
            chain: Chain::Ethereum,
            name: Some(name.to_string()),
            image_url: None,
            collection: Some(CollectionInfo {
                name: "Sample Collection".into(),
                image_url: None,
            }),
            floor_price: None,
        }
    }

    #[tokio::test]
    async fn falls_through_to_secondary_on_unrecognized_payload() {
        let secondary_meta = sample_metadata("from-secondary");
        let chain = ProviderChain::new(vec![
            Box::new(FakeProvider::unrecognized("primary", Chain::Ethereum)),
            Box::new(FakeProvider::ok(
                "secondary",
                Chain::Ethereum,
                secondary_meta.clone(),
            )),
        ]);

        let got = chain
            .fetch(Chain::Ethereum, &Address::new("0xc0ffee"), 7, &Address::new("0xme"))
            .await
            .unwrap();
        assert_eq!(got, secondary_meta);
    }

    #[tokio::test]
    async fn unconfigured_provider_is_skipped_not_called() {
        let primary = FakeProvider::unconfigured("primary", Chain::Ethereum);
        let primary_calls = primary.calls.clone();

        let chain = ProviderChain::new(vec![
            Box::new(primary),
            Box::new(FakeProvider::ok(
                "secondary",
                Chain::Ethereum,
                sample_metadata("fallback"),
            )),
        ]);

        let got = chain
            .fetch(Chain::Ethereum, &Address::new("0xc0ffee"), 7, &Address::new("0xme"))
            .await
            .unwrap();
        assert_eq!(got.name.as_deref(), Some("fallback"));

        // The unconfigured provider was never invoked.
        assert_eq!(primary_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn exhausted_chain_reports_all_providers_failed() {
        let chain = ProviderChain::new(vec![
            Box::new(FakeProvider::unrecognized("primary", Chain::Ethereum)),
            Box::new(FakeProvider::unrecognized("secondary", Chain::Ethereum)),
        ]);

        let err = chain
            .fetch(Chain::Ethereum, &Address::new("0xc0ffee"), 7, &Address::new("0xme"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            MetadataError::AllProvidersFailed {
                chain: Chain::Ethereum
            }
        ));
    }

    #[tokio::test]
    async fn providers_for_other_chains_are_ignored() {
        let chain = ProviderChain::new(vec![Box::new(FakeProvider::ok(
            "polygon-only",
            Chain::Polygon,
            sample_metadata("polygon"),
        ))]);

        let err = chain
            .fetch(Chain::Ethereum, &Address::new("0xc0ffee"), 7, &Address::new("0xme"))
            .await
            .unwrap_err();
        assert!(matches!(err, MetadataError::AllProvidersFailed { .. }));
    }
}
