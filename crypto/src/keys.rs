//! Ed25519 key generation.

use bos_types::{ChainAddress, KeyPair, PrivateKey};
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("keypair blob must be 64 bytes, got {0}")]
    BadLength(usize),

    #[error("public half of keypair blob does not match its secret half")]
    Mismatch,
}

/// Generate a new Ed25519 key pair from a secure random source.
pub fn generate_keypair() -> KeyPair {
    let signing_key = SigningKey::generate(&mut OsRng);
    KeyPair {
        address: ChainAddress::new(signing_key.verifying_key().to_bytes()),
        private: PrivateKey(signing_key.to_bytes()),
    }
}

/// Derive a key pair from a 32-byte seed (deterministic).
pub fn keypair_from_seed(seed: &[u8; 32]) -> KeyPair {
    let signing_key = SigningKey::from_bytes(seed);
    KeyPair {
        address: ChainAddress::new(signing_key.verifying_key().to_bytes()),
        private: PrivateKey(signing_key.to_bytes()),
    }
}

/// Import a 64-byte `secret || public` keypair blob.
///
/// The public half is re-derived from the secret and must match.
pub fn keypair_from_bytes(bytes: &[u8]) -> Result<KeyPair, KeyError> {
    if bytes.len() != 64 {
        return Err(KeyError::BadLength(bytes.len()));
    }
    let mut seed = [0u8; 32];
    seed.copy_from_slice(&bytes[..32]);
    let keypair = keypair_from_seed(&seed);
    if keypair.address.as_bytes()[..] != bytes[32..] {
        return Err(KeyError::Mismatch);
    }
    Ok(keypair)
}
