use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Blockchain families the metadata layer knows how to query.
///
/// Serialized as the lowercase slug the upstream API uses (`"ethereum"`,
/// `"polygon"`).  Inbox entries for non-NFT conversations carry the slug
/// `"none"`, which intentionally does not parse to a `Chain`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Ethereum,
    Polygon,
}

impl Chain {
    pub fn from_slug(slug: &str) -> Result<Self, TypeError> {
        match slug {
            "ethereum" => Ok(Self::Ethereum),
            "polygon" => Ok(Self::Polygon),
            other => Err(TypeError::UnknownChain(other.to_string())),
        }
    }

    pub fn slug(&self) -> &'static str {
        match self {
            Self::Ethereum => "ethereum",
            Self::Polygon => "polygon",
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.slug())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_round_trip() {
        assert_eq!(Chain::from_slug("ethereum").unwrap(), Chain::Ethereum);
        assert_eq!(Chain::from_slug("polygon").unwrap(), Chain::Polygon);
        assert!(Chain::from_slug("none").is_err());
        assert!(Chain::from_slug("solana").is_err());
    }
}
