//! Recent blockhash, the chain's freshness token.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::TypesError;

/// A 32-byte blockhash, rendered in base58.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Blockhash([u8; 32]);

impl Blockhash {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn parse(raw: &str) -> Result<Self, TypesError> {
        let bytes = bs58::decode(raw)
            .into_vec()
            .map_err(|e| TypesError::Base58(e.to_string()))?;
        let arr: [u8; 32] = bytes.as_slice().try_into().map_err(|_| TypesError::Length {
            expected: 32,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }
}

impl fmt::Display for Blockhash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for Blockhash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Blockhash({self})")
    }
}

impl TryFrom<String> for Blockhash {
    type Error = TypesError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Blockhash> for String {
    fn from(hash: Blockhash) -> Self {
        hash.to_string()
    }
}

/// The freshness metadata a transfer must carry.
///
/// The chain rejects a transaction once its block height passes
/// `last_valid_block_height`; nothing on the client side re-checks that window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreshnessToken {
    pub blockhash: Blockhash,
    pub last_valid_block_height: u64,
}
