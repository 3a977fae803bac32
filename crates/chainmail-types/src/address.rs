use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// A wallet address, normalized to lowercase.
///
/// The upstream API is case-insensitive about addresses (the same account may
/// appear checksummed in one record and lowercased in the next), so equality
/// and hashing must not depend on the original casing.  Normalizing once at
/// construction keeps every comparison in the engine a plain `==`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_lowercase())
    }

    /// Like [`Address::new`] but rejects empty input.
    pub fn parse(raw: &str) -> Result<Self, TypeError> {
        let addr = Self::new(raw);
        if addr.is_empty() {
            return Err(TypeError::InvalidAddress(raw.to_string()));
        }
        Ok(addr)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Records arriving off the wire may carry no address at all; the
    /// projector uses this to drop them.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Abbreviated form for log lines: `0x1234..ab`.
    ///
    /// Counts characters, not bytes; addresses come off the wire and are
    /// not guaranteed to be ASCII.
    pub fn short(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        if chars.len() <= 10 {
            return self.0.clone();
        }
        let prefix: String = chars[..6].iter().collect();
        let suffix: String = chars[chars.len() - 2..].iter().collect();
        format!("{prefix}..{suffix}")
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
