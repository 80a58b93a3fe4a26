//! Chain account address: a 32-byte Ed25519 public key rendered in base58.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TypesError;

/// A Solana-style account address.
///
/// Stored as the raw 32 public-key bytes; displayed and serialized as base58.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChainAddress([u8; 32]);

impl ChainAddress {
    /// Length of the decoded address in bytes.
    pub const LEN: usize = 32;
    /// Shortest base58 rendering of a 32-byte key.
    pub const MIN_ENCODED_LEN: usize = 32;
    /// Longest base58 rendering of a 32-byte key.
    pub const MAX_ENCODED_LEN: usize = 44;

    /// The system program, owner of plain wallet accounts (all zero bytes).
    pub const SYSTEM_PROGRAM: Self = Self([0u8; 32]);

    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Parse a base58 address, checking alphabet, encoded length and decoded length.
    pub fn parse(raw: &str) -> Result<Self, TypesError> {
        if raw.len() < Self::MIN_ENCODED_LEN || raw.len() > Self::MAX_ENCODED_LEN {
            return Err(TypesError::Base58(format!(
                "address must be {}-{} characters, got {}",
                Self::MIN_ENCODED_LEN,
                Self::MAX_ENCODED_LEN,
                raw.len()
            )));
        }
        let bytes = bs58::decode(raw)
            .into_vec()
            .map_err(|e| TypesError::Base58(e.to_string()))?;
        let arr: [u8; 32] = bytes.as_slice().try_into().map_err(|_| TypesError::Length {
            expected: Self::LEN,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }

    /// Shortened form for log lines and UI labels, e.g. `7xKX…AsU`.
    pub fn abbreviated(&self) -> String {
        let full = self.to_string();
        if full.len() <= 8 {
            return full;
        }
        format!("{}…{}", &full[..4], &full[full.len() - 3..])
    }
}

impl fmt::Display for ChainAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", bs58::encode(self.0).into_string())
    }
}

impl fmt::Debug for ChainAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChainAddress({self})")
    }
}

impl FromStr for ChainAddress {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ChainAddress {
    type Error = TypesError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<ChainAddress> for String {
    fn from(addr: ChainAddress) -> Self {
        addr.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_program_renders_as_ones() {
        assert_eq!(
            ChainAddress::SYSTEM_PROGRAM.to_string(),
            "11111111111111111111111111111111"
        );
    }

    #[test]
    fn parse_display_roundtrip() {
        let addr = ChainAddress::new([7u8; 32]);
        let parsed = ChainAddress::parse(&addr.to_string()).unwrap();
        assert_eq!(parsed, addr);
    }

    #[test]
    fn rejects_non_base58_characters() {
        // '0', 'O', 'I' and 'l' are outside the base58 alphabet.
        let raw = "0OIl0OIl0OIl0OIl0OIl0OIl0OIl0OIl";
        assert!(matches!(ChainAddress::parse(raw), Err(TypesError::Base58(_))));
    }

    #[test]
    fn rejects_too_short_and_too_long() {
        assert!(ChainAddress::parse("abc").is_err());
        assert!(ChainAddress::parse(&"1".repeat(45)).is_err());
    }

    #[test]
    fn rejects_wrong_decoded_length() {
        // 32 base58 characters that decode to fewer than 32 bytes.
        let raw = "2".repeat(32);
        assert!(matches!(
            ChainAddress::parse(&raw),
            Err(TypesError::Length { expected: 32, .. })
        ));
    }

    #[test]
    fn serde_uses_base58_string() {
        let addr = ChainAddress::new([1u8; 32]);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{addr}\""));
        let back: ChainAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }

    #[test]
    fn abbreviated_keeps_head_and_tail() {
        let addr = ChainAddress::new([9u8; 32]);
        let full = addr.to_string();
        let short = addr.abbreviated();
        assert!(short.starts_with(&full[..4]));
        assert!(short.ends_with(&full[full.len() - 3..]));
    }
}
