//! Canonical NFT metadata, independent of which provider supplied it.

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::chain::Chain;

/// The one unified metadata shape every provider payload is normalized into.
///
/// Partial payloads are expected; a missing collection image (for instance)
/// leaves the corresponding field absent rather than failing normalization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NftMetadata {
    pub address: Address,
    pub token_id: i64,
    pub chain: Chain,
    pub name: Option<String>,
    pub image_url: Option<String>,
    pub collection: Option<CollectionInfo>,
    pub floor_price: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectionInfo {
    pub name: String,
    pub image_url: Option<String>,
}

/// Key under which metadata (or read state) is tracked: an NFT token or a
/// bare account.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SubjectKey {
    Token { contract: Address, token_id: i64 },
    Account(Address),
}

impl SubjectKey {
    pub fn token(contract: impl Into<Address>, token_id: i64) -> Self {
        Self::Token {
            contract: contract.into(),
            token_id,
        }
    }
}
