//! Structurally gated metadata cache.
//!
//! Multiple independent triggers (mount, periodic refresh, a sibling view
//! of the same token) may resolve the same subject concurrently.  The cache
//! compares candidates by deep value equality and only a real difference
//! updates the entry and signals dependents, so identical re-resolutions
//! cause no churn.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::debug;

use chainmail_types::{NftMetadata, SubjectKey};

/// Per-subject memo of the most recently *accepted* metadata.
///
/// Invariant: at most one entry per key, always the last structurally
/// distinct value handed to [`MetadataCache::accept`].
#[derive(Default)]
pub struct MetadataCache {
    entries: Mutex<HashMap<SubjectKey, NftMetadata>>,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer `candidate` for `key`.
    ///
    /// Returns true when the candidate differed from the cached value (or
    /// the key was absent) and was stored; false when it was structurally
    /// equal and the cache was left untouched.
    pub fn accept(&self, key: SubjectKey, candidate: NftMetadata) -> bool {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());

        if entries.get(&key) == Some(&candidate) {
            return false;
        }

        debug!(?key, "metadata cache updated");
        entries.insert(key, candidate);
        true
    }

    pub fn get(&self, key: &SubjectKey) -> Option<NftMetadata> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainmail_types::{Address, Chain, CollectionInfo};

    fn metadata(name: &str) -> NftMetadata {
        NftMetadata {
            address: Address::new("0xc0ffee"),
            token_id: 7,
            chain: Chain::Ethereum,
            name: Some(name.to_string()),
            image_url: Some("https://img.example/7.png".into()),
            collection: Some(CollectionInfo {
                name: "Collection".into(),
                image_url: None,
            }),
            floor_price: Some(0.5),
        }
    }

    fn key() -> SubjectKey {
        SubjectKey::token(Address::new("0xc0ffee"), 7)
    }

    #[test]
    fn first_accept_stores_and_signals() {
        let cache = MetadataCache::new();
        assert!(cache.accept(key(), metadata("A")));
        assert_eq!(cache.get(&key()), Some(metadata("A")));
    }

    #[test]
    fn structurally_equal_candidate_is_rejected() {
        let cache = MetadataCache::new();
        cache.accept(key(), metadata("A"));

        // A fresh, identical value (different allocation, same structure).
        assert!(!cache.accept(key(), metadata("A")));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn distinct_candidate_replaces() {
        let cache = MetadataCache::new();
        cache.accept(key(), metadata("A"));

        assert!(cache.accept(key(), metadata("B")));
        assert_eq!(cache.get(&key()), Some(metadata("B")));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn keys_are_independent() {
        let cache = MetadataCache::new();
        cache.accept(key(), metadata("A"));
        cache.accept(SubjectKey::token(Address::new("0xdead"), 1), metadata("B"));
        assert_eq!(cache.len(), 2);
    }
}
