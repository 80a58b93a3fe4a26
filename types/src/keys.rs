//! Key material for locally held signing keys.

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::address::ChainAddress;

/// A 32-byte Ed25519 secret seed.
///
/// Deliberately not `Debug`, `Serialize` or `Clone`. Key bytes are zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey(pub [u8; 32]);

/// An Ed25519 key pair. The public half is the account address.
///
/// Use `bos_crypto::generate_keypair()` or `bos_crypto::keypair_from_seed()`
/// to construct key pairs.
pub struct KeyPair {
    pub address: ChainAddress,
    pub private: PrivateKey,
}
