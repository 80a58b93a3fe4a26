//! Fundamental types for the Book of Scams bounty core.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! chain addresses, signatures, lamport amounts, freshness tokens, timestamps,
//! cluster identifiers, key material, and the persisted bounty entities.

pub mod address;
pub mod amount;
pub mod blockhash;
pub mod error;
pub mod keys;
pub mod network;
pub mod record;
pub mod signature;
pub mod time;

pub use address::ChainAddress;
pub use amount::{Lamports, LAMPORTS_PER_SOL, SOL_DECIMALS};
pub use blockhash::{Blockhash, FreshnessToken};
pub use error::TypesError;
pub use keys::{KeyPair, PrivateKey};
pub use network::Cluster;
pub use record::{BountyTotal, ContributionRecord, RecordId, ScammerRecord};
pub use signature::Signature;
pub use time::Timestamp;

pub use rust_decimal::Decimal;
