//! NFT metadata resolution: provider chain, structural cache, and the
//! service that ties them together with at-most-one-in-flight per subject.

pub mod alchemy;
pub mod cache;
pub mod chain;
pub mod opensea;

pub use alchemy::AlchemyProvider;
pub use cache::MetadataCache;
pub use chain::{NftProvider, ProviderChain};
pub use opensea::OpenSeaProvider;

use std::collections::HashSet;
use std::sync::Mutex;

use tracing::debug;

use chainmail_types::{Address, Chain, NftMetadata, SubjectKey};

use crate::config::ClientConfig;
use crate::error::MetadataError;

/// Outcome of a [`MetadataService::resolve`] call.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataResolution {
    /// The chain yielded metadata.  `changed` is the cache's verdict: false
    /// means the value was structurally identical to what was already held
    /// and dependents need not re-render.
    Resolved {
        metadata: NftMetadata,
        changed: bool,
    },
    /// Another resolution for this subject is already in flight; the cached
    /// value (possibly absent) is what the caller gets for now.
    Pending,
}

/// Metadata resolution front door.
///
/// Guarantees at most one in-flight provider-chain walk per subject key;
/// a second trigger for the same subject while one is outstanding observes
/// `Pending` instead of doubling the provider traffic.
pub struct MetadataService {
    chain: ProviderChain,
    cache: MetadataCache,
    in_flight: Mutex<HashSet<SubjectKey>>,
}

impl MetadataService {
    pub fn new(chain: ProviderChain) -> Self {
        Self {
            chain,
            cache: MetadataCache::new(),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(ProviderChain::from_config(config))
    }

    /// The cached metadata for a subject, if any resolution has succeeded.
    pub fn cached(&self, key: &SubjectKey) -> Option<NftMetadata> {
        self.cache.get(key)
    }

    /// Resolve metadata for one token.
    ///
    /// On chain exhaustion the subject simply stays unresolved; the error
    /// is surfaced for logging but the next externally triggered attempt
    /// (mount, poll) is the retry policy.
    pub async fn resolve(
        &self,
        chain: Chain,
        contract: &Address,
        token_id: i64,
        viewer: &Address,
    ) -> Result<MetadataResolution, MetadataError> {
        let key = SubjectKey::token(contract.clone(), token_id);

        {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
            if !in_flight.insert(key.clone()) {
                debug!(contract = %contract.short(), token_id, "resolution already in flight");
                return Ok(MetadataResolution::Pending);
            }
        }

        let result = self.chain.fetch(chain, contract, token_id, viewer).await;

        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&key);

        match result {
            Ok(metadata) => {
                let changed = self.cache.accept(key, metadata.clone());
                Ok(MetadataResolution::Resolved { metadata, changed })
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::chain::tests::{sample_metadata, FakeProvider};
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use chainmail_types::NftMetadata;

    use crate::error::ProviderError;

    fn service_with(providers: Vec<Box<dyn NftProvider>>) -> MetadataService {
        MetadataService::new(ProviderChain::new(providers))
    }

    #[tokio::test]
    async fn resolved_metadata_reaches_the_cache() {
        let service = service_with(vec![Box::new(FakeProvider::ok(
            "primary",
            Chain::Ethereum,
            sample_metadata("A"),
        ))]);
        let contract = Address::new("0xc0ffee");
        let viewer = Address::new("0xme");

        let resolution = service
            .resolve(Chain::Ethereum, &contract, 7, &viewer)
            .await
            .unwrap();
        assert_eq!(
            resolution,
            MetadataResolution::Resolved {
                metadata: sample_metadata("A"),
                changed: true,
            }
        );
        assert_eq!(
            service.cached(&SubjectKey::token(contract, 7)),
            Some(sample_metadata("A"))
        );
    }

    #[tokio::test]
    async fn identical_re_resolution_reports_unchanged() {
        let service = service_with(vec![Box::new(FakeProvider::ok(
            "primary",
            Chain::Ethereum,
            sample_metadata("A"),
        ))]);
        let contract = Address::new("0xc0ffee");
        let viewer = Address::new("0xme");

        service
            .resolve(Chain::Ethereum, &contract, 7, &viewer)
            .await
            .unwrap();
        let second = service
            .resolve(Chain::Ethereum, &contract, 7, &viewer)
            .await
            .unwrap();

        assert!(matches!(
            second,
            MetadataResolution::Resolved { changed: false, .. }
        ));
    }

    #[tokio::test]
    async fn exhausted_chain_leaves_subject_unresolved() {
        let service = service_with(vec![Box::new(FakeProvider::unrecognized(
            "primary",
            Chain::Ethereum,
        ))]);
        let contract = Address::new("0xc0ffee");
        let viewer = Address::new("0xme");

        assert!(service
            .resolve(Chain::Ethereum, &contract, 7, &viewer)
            .await
            .is_err());
        assert_eq!(service.cached(&SubjectKey::token(contract, 7)), None);
    }

    /// Provider that parks until virtual time advances.
    struct SlowProvider {
        metadata: NftMetadata,
    }

    #[async_trait]
    impl NftProvider for SlowProvider {
        fn name(&self) -> &'static str {
            "slow"
        }

        fn chain(&self) -> Chain {
            Chain::Ethereum
        }

        fn configured(&self) -> bool {
            true
        }

        async fn fetch(
            &self,
            _contract: &Address,
            _token_id: i64,
            _viewer: &Address,
        ) -> Result<NftMetadata, ProviderError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(self.metadata.clone())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_resolution_of_one_subject_is_deduplicated() {
        let service = Arc::new(service_with(vec![Box::new(SlowProvider {
            metadata: sample_metadata("A"),
        })]));
        let contract = Address::new("0xc0ffee");
        let viewer = Address::new("0xme");

        let first = {
            let service = service.clone();
            let contract = contract.clone();
            let viewer = viewer.clone();
            tokio::spawn(async move {
                service.resolve(Chain::Ethereum, &contract, 7, &viewer).await
            })
        };

        // Let the first resolution reach its provider await.
        tokio::task::yield_now().await;

        let second = service
            .resolve(Chain::Ethereum, &contract, 7, &viewer)
            .await
            .unwrap();
        assert_eq!(second, MetadataResolution::Pending);

        tokio::time::advance(Duration::from_secs(61)).await;
        let first = first.await.unwrap().unwrap();
        assert!(matches!(first, MetadataResolution::Resolved { .. }));

        // Once the flight lands, a new trigger resolves again.
        let third = service
            .resolve(Chain::Ethereum, &contract, 7, &viewer)
            .await
            .unwrap();
        assert!(matches!(
            third,
            MetadataResolution::Resolved { changed: false, .. }
        ));
    }
}
