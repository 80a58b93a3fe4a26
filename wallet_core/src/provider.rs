//! The wallet provider contract.
//!
//! A provider owns the user's signing key. The bounty core never touches key
//! material directly; it asks the provider to connect, sign and send, and
//! listens to its events.

use async_trait::async_trait;
use bos_transactions::Transaction;
use bos_types::{ChainAddress, Signature};
use tokio::sync::broadcast;

use crate::error::ProviderError;

/// Notifications a provider pushes without being asked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProviderEvent {
    Connect(ChainAddress),
    Disconnect,
    /// The user switched accounts in the wallet. `None` means the wallet no
    /// longer exposes an account to this application.
    AccountChanged(Option<ChainAddress>),
}

#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Short human-readable name for logs.
    fn name(&self) -> &str;

    /// Ask the user to connect. Returns the exposed account address.
    async fn connect(&self) -> Result<ChainAddress, ProviderError>;

    async fn disconnect(&self) -> Result<(), ProviderError>;

    async fn sign_message(&self, message: &[u8]) -> Result<Signature, ProviderError>;

    /// Sign `tx` with the connected account and broadcast it.
    ///
    /// Returns the transaction signature reported by the node.
    async fn sign_and_send_transaction(&self, tx: &Transaction) -> Result<Signature, ProviderError>;

    /// Subscribe to provider events. Each call returns an independent receiver.
    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent>;
}
