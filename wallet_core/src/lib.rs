//! Wallet side of the bounty contribution flow.
//!
//! Provides everything between "user pressed contribute" and "the chain has a
//! signature for it":
//! - The wallet provider contract and its events
//! - `WalletSession`: connection state and the provider event subscription
//! - `TransactionBuilder`: lamport conversion, freshness token, pre-flight balance
//! - `SubmissionGateway`: sign-and-send with a normalized error taxonomy
//! - `KeypairWallet`: a provider backed by a local Ed25519 key
//! - Encrypted keystore files for that key

pub mod error;
pub mod gateway;
pub mod keypair;
pub mod keystore;
pub mod provider;
pub mod session;
pub mod transaction_builder;

pub use error::{BuildError, KeystoreError, ProviderError, SessionError, SubmissionError};
pub use gateway::SubmissionGateway;
pub use keypair::{KeypairWallet, TransferPrompt};
pub use keystore::{
    decrypt_keypair, encrypt_keypair, encrypt_keypair_with, load_keystore, load_solana_keypair,
    save_keystore, KdfParams, KeystoreFile,
};
pub use provider::{ProviderEvent, WalletProvider};
pub use session::{EventSubscription, SessionStatus, WalletSession};
pub use transaction_builder::TransactionBuilder;
