use thiserror::Error;

/// Errors produced by the transport layer.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The underlying HTTP request failed (connect, timeout, TLS, ...).
    #[error("Request error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("Unexpected status {status} from {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },

    /// The response body did not match the expected shape.
    #[error("Malformed response: {0}")]
    Decode(String),

    /// A required credential or endpoint URL is absent from the
    /// configuration.  Callers treat this as "silently skip", not a failure.
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ApiError>;
