//! Engine configuration loaded from environment variables.
//!
//! All settings except the REST endpoint have defaults, so a client can run
//! against a local message store with a single variable set.  Missing
//! provider keys are not errors: the corresponding provider is skipped by
//! the metadata chain.

use std::time::Duration;

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the off-chain message store.
    /// Env: `CHAINMAIL_REST_API`
    pub rest_api_url: String,

    /// IPFS HTTP API endpoint used to store message bodies.
    /// Env: `CHAINMAIL_IPFS_API`
    /// Default: `https://ipfs.infura.io:5001`
    pub ipfs_api_url: String,

    /// IPFS gateway used to resolve content pointers.
    /// Env: `CHAINMAIL_IPFS_GATEWAY`
    /// Default: `https://ipfs.infura.io/ipfs`
    pub ipfs_gateway_url: String,

    /// OpenSea API key.  When absent the OpenSea provider is skipped.
    /// Env: `OPENSEA_API_KEY`
    pub opensea_api_key: Option<String>,

    /// Alchemy API key for Ethereum mainnet.
    /// Env: `ALCHEMY_API_KEY_ETHEREUM`
    pub alchemy_api_key_ethereum: Option<String>,

    /// Alchemy API key for Polygon mainnet.
    /// Env: `ALCHEMY_API_KEY_POLYGON`
    pub alchemy_api_key_polygon: Option<String>,

    /// Inbox poll interval.
    /// Env: `CHAINMAIL_POLL_INTERVAL_SECS`
    /// Default: 5 seconds.
    pub poll_interval: Duration,
}

impl ClientConfig {
    /// Build a config from the process environment.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            rest_api_url: env_or("CHAINMAIL_REST_API", &defaults.rest_api_url),
            ipfs_api_url: env_or("CHAINMAIL_IPFS_API", &defaults.ipfs_api_url),
            ipfs_gateway_url: env_or("CHAINMAIL_IPFS_GATEWAY", &defaults.ipfs_gateway_url),
            opensea_api_key: env_opt("OPENSEA_API_KEY"),
            alchemy_api_key_ethereum: env_opt("ALCHEMY_API_KEY_ETHEREUM"),
            alchemy_api_key_polygon: env_opt("ALCHEMY_API_KEY_POLYGON"),
            poll_interval: std::env::var("CHAINMAIL_POLL_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.poll_interval),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            rest_api_url: "http://localhost:8000".to_string(),
            ipfs_api_url: "https://ipfs.infura.io:5001".to_string(),
            ipfs_gateway_url: "https://ipfs.infura.io/ipfs".to_string(),
            opensea_api_key: None,
            alchemy_api_key_ethereum: None,
            alchemy_api_key_polygon: None,
            poll_interval: Duration::from_secs(5),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
