//! Cryptographic primitives for locally held wallet keys.
//!
//! - **Ed25519** key generation, signing and verification
//! - Import of 64-byte keypair blobs (the format written by the Solana CLI)

pub mod keys;
pub mod sign;

pub use keys::{generate_keypair, keypair_from_bytes, keypair_from_seed, KeyError};
pub use sign::{sign_message, verify_signature};
