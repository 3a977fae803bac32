use thiserror::Error;

use chainmail_api::ApiError;
use chainmail_store::StoreError;

/// Errors from the inbox synchronizer.
///
/// A fetch failure is observable (the last snapshot is retained and the
/// fetching-failed flag is raised) but never fatal; the next interval tick
/// retries.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Inbox fetch failed: {0}")]
    Fetch(#[from] ApiError),

    #[error("Persisting snapshot failed: {0}")]
    Persist(#[from] StoreError),
}

/// Errors from content resolution.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Content fetch failed: {0}")]
    Fetch(#[from] ApiError),
}

/// Errors from a single metadata provider attempt.  Any of these makes the
/// chain fall through to the next configured provider.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider returned status {0}")]
    Status(reqwest::StatusCode),

    /// The payload parsed but carried no recognizable collection name.
    #[error("Payload lacked a recognizable collection name")]
    UnrecognizedPayload,
}

/// Errors from the metadata provider chain.
#[derive(Error, Debug)]
pub enum MetadataError {
    /// Every configured provider for the chain was tried and none yielded a
    /// usable payload.  The subject stays unresolved until the next
    /// externally triggered attempt.
    #[error("All metadata providers failed for chain {chain}")]
    AllProvidersFailed { chain: chainmail_types::Chain },
}

/// Errors from read-state writes.
#[derive(Error, Debug)]
pub enum ReadError {
    #[error("Read-state write failed: {0}")]
    Write(#[from] ApiError),
}
