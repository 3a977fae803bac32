//! Memoizing content resolution.
//!
//! Content pointers are content-addressed, so a pointer always resolves to
//! the same text and re-resolving is safe.  The resolver memoizes by
//! pointer value and dedups concurrent resolutions of the same pointer:
//! while one fetch is in flight, further callers observe `Pending` instead
//! of issuing a second underlying fetch.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use chainmail_api::ContentStore;

use crate::error::ResolveError;

/// Outcome of a [`ContentResolver::resolve`] call.
///
/// `Pending` is a transient state, not an error: another resolution for the
/// same pointer is already in flight and the caller should simply re-render
/// on its next pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(String),
    Pending,
}

/// Pointer-keyed memoizing resolver over a [`ContentStore`].
pub struct ContentResolver {
    store: Arc<dyn ContentStore>,
    resolved: Mutex<HashMap<String, String>>,
    in_flight: Mutex<HashSet<String>>,
}

impl ContentResolver {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self {
            store,
            resolved: Mutex::new(HashMap::new()),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Seed the memo with a body already known to the caller, such as a
    /// message it just stored itself.
    pub fn prime(&self, pointer: &str, text: &str) {
        self.resolved
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(pointer.to_string(), text.to_string());
    }

    /// The memoized body for `pointer`, if resolution has completed.
    pub fn cached(&self, pointer: &str) -> Option<String> {
        self.resolved
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(pointer)
            .cloned()
    }

    /// Resolve `pointer` to its text body.
    ///
    /// Hits the memo first; otherwise fetches from the content store.  The
    /// decrypt hook is applied to freshly fetched bodies before caching.
    pub async fn resolve(&self, pointer: &str) -> Result<Resolution, ResolveError> {
        if let Some(text) = self.cached(pointer) {
            return Ok(Resolution::Resolved(text));
        }

        {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
            if !in_flight.insert(pointer.to_string()) {
                return Ok(Resolution::Pending);
            }
        }

        let result = self.store.fetch(pointer).await;
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(pointer);

        match result {
            Ok(raw) => {
                let text = decrypt_in_place(raw);
                debug!(pointer, bytes = text.len(), "content resolved");
                self.resolved
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .insert(pointer.to_string(), text.clone());
                Ok(Resolution::Resolved(text))
            }
            Err(e) => {
                warn!(pointer, error = %e, "content resolution failed");
                Err(e.into())
            }
        }
    }
}

/// Placeholder for message decryption, which is stubbed upstream.  Bodies
/// currently pass through unchanged.
fn decrypt_in_place(body: String) -> String {
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chainmail_api::{ApiError, ContentStore};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory content store that counts fetches.
    struct FakeStore {
        bodies: HashMap<String, String>,
        fetches: AtomicUsize,
    }

    impl FakeStore {
        fn with(bodies: &[(&str, &str)]) -> Self {
            Self {
                bodies: bodies
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                fetches: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ContentStore for FakeStore {
        async fn fetch(&self, pointer: &str) -> chainmail_api::Result<String> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.bodies
                .get(pointer)
                .cloned()
                .ok_or_else(|| ApiError::Decode(format!("no such pointer: {pointer}")))
        }

        async fn store(&self, _text: &str) -> chainmail_api::Result<String> {
            unimplemented!("not used by resolver tests")
        }
    }

    #[tokio::test]
    async fn resolution_is_idempotent_and_memoized() {
        let store = Arc::new(FakeStore::with(&[("QmA", "hello")]));
        let resolver = ContentResolver::new(store.clone());

        let first = resolver.resolve("QmA").await.unwrap();
        let second = resolver.resolve("QmA").await.unwrap();

        assert_eq!(first, Resolution::Resolved("hello".into()));
        assert_eq!(second, Resolution::Resolved("hello".into()));
        // The second resolve must not issue a second underlying fetch.
        assert_eq!(store.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(resolver.cached("QmA"), Some("hello".into()));
    }

    #[tokio::test]
    async fn failed_resolution_is_not_cached() {
        let store = Arc::new(FakeStore::with(&[]));
        let resolver = ContentResolver::new(store.clone());

        assert!(resolver.resolve("QmMissing").await.is_err());
        assert_eq!(resolver.cached("QmMissing"), None);

        // A later attempt fetches again (retry on next natural trigger).
        assert!(resolver.resolve("QmMissing").await.is_err());
        assert_eq!(store.fetches.load(Ordering::SeqCst), 2);
    }

    /// Store whose fetches park until virtual time advances.
    struct SlowStore {
        fetches: AtomicUsize,
    }

    #[async_trait]
    impl ContentStore for SlowStore {
        async fn fetch(&self, pointer: &str) -> chainmail_api::Result<String> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_secs(30)).await;
            Ok(format!("body of {pointer}"))
        }

        async fn store(&self, _text: &str) -> chainmail_api::Result<String> {
            unimplemented!("not used by resolver tests")
        }
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_resolution_of_one_pointer_is_deduplicated() {
        let store = Arc::new(SlowStore {
            fetches: AtomicUsize::new(0),
        });
        let resolver = Arc::new(ContentResolver::new(store.clone()));

        let first = {
            let resolver = resolver.clone();
            tokio::spawn(async move { resolver.resolve("QmA").await })
        };

        // Let the first resolution reach its fetch await.
        tokio::task::yield_now().await;

        let second = resolver.resolve("QmA").await.unwrap();
        assert_eq!(second, Resolution::Pending);

        tokio::time::advance(std::time::Duration::from_secs(31)).await;
        let first = first.await.unwrap().unwrap();
        assert_eq!(first, Resolution::Resolved("body of QmA".into()));
        assert_eq!(store.fetches.load(Ordering::SeqCst), 1);
    }
}
