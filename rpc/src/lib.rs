//! Chain read/submit endpoint.
//!
//! The rest of the workspace talks to the chain only through [`ChainClient`]:
//! - balance reads (pre-flight checks)
//! - the latest blockhash (transaction freshness)
//! - signature status (confirmation watching)
//! - raw transaction submission (local signers)
//!
//! [`RpcClient`] implements it over HTTP JSON-RPC 2.0.

pub mod client;
pub mod error;
pub mod types;

use async_trait::async_trait;
use bos_types::{ChainAddress, FreshnessToken, Lamports, Signature};

pub use client::RpcClient;
pub use error::RpcError;
pub use types::{Commitment, SignatureStatus};

/// Read and submit operations against a chain node.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Current balance of an account.
    async fn get_balance(&self, address: &ChainAddress) -> Result<Lamports, RpcError>;

    /// A recent blockhash plus the last block height at which it is still accepted.
    async fn get_latest_blockhash(&self) -> Result<FreshnessToken, RpcError>;

    /// Status of a submitted transaction, or `None` if the node has not seen it.
    async fn get_signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<SignatureStatus>, RpcError>;

    /// Broadcast a fully signed, wire-encoded transaction.
    async fn send_transaction(&self, wire: &[u8]) -> Result<Signature, RpcError>;
}
