//! Nullable infrastructure for deterministic testing.
//!
//! Every external collaborator of the contribution flow (wallet provider,
//! chain endpoint, data store) sits behind a trait. This crate provides
//! in-memory implementations that:
//! - Return deterministic values
//! - Can be scripted and inspected by the test
//! - Never touch the network or the filesystem

pub mod chain;
pub mod provider;
pub mod store;

pub use chain::NullChain;
pub use provider::NullWalletProvider;
pub use store::NullBountyStore;
