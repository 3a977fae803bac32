use thiserror::Error;

/// Errors produced while constructing or parsing domain types.
#[derive(Error, Debug)]
pub enum TypeError {
    /// A chain slug was not one of the supported chains.
    #[error("Unknown chain: {0}")]
    UnknownChain(String),

    /// A wallet address was empty or otherwise unusable.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}
