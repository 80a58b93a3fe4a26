use bos_rpc::RpcError;
use bos_transactions::TransitionError;
use bos_types::{ChainAddress, Lamports, Signature};
use thiserror::Error;

/// What a wallet provider can report back.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("wallet extension not installed")]
    NotInstalled,

    #[error("wallet not connected")]
    NotConnected,

    #[error("user rejected the request")]
    UserRejected,

    #[error("node rejected the transaction ({code}): {message}")]
    NetworkRejected { code: i64, message: String },

    /// Signed locally, but whether the node received it is unknown.
    #[error("send of {signature} not acknowledged: {reason}")]
    SendUncertain { signature: Signature, reason: String },

    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("wallet extension not installed")]
    ProviderMissing,

    #[error("connection request rejected by user")]
    UserRejected,

    #[error("wallet provider error: {0}")]
    Provider(String),
}

impl From<ProviderError> for SessionError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::NotInstalled => Self::ProviderMissing,
            ProviderError::UserRejected => Self::UserRejected,
            other => Self::Provider(other.to_string()),
        }
    }
}

/// Failures while building a transfer. Nothing has been signed or sent.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("amount is below one lamport")]
    AmountTooSmall,

    #[error("amount does not fit in a lamport count")]
    AmountOverflow,

    #[error("no signing key available for {0}")]
    NoSenderKey(ChainAddress),

    #[error("sender and recipient are the same account")]
    SelfTransfer,

    #[error("insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: Lamports, available: Lamports },

    #[error("chain read failed: {0}")]
    Chain(#[from] RpcError),
}

/// Failures of the sign-and-send step.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubmissionError {
    /// The user declined in the wallet. A benign cancellation.
    #[error("transfer cancelled in wallet")]
    UserRejected,

    #[error("wallet unavailable: {0}")]
    ProviderUnavailable(String),

    /// The node refused the transaction (stale blockhash, insufficient funds).
    #[error("network rejected the transaction: {0}")]
    NetworkRejected(String),

    #[error("wallet error: {0}")]
    Unknown(String),

    /// The transaction was signed as `signature` and may be on its way.
    #[error("transfer {signature} may have been sent: {reason}")]
    SendUncertain { signature: Signature, reason: String },

    #[error("transaction is not ready for submission: {0}")]
    InvalidState(#[from] TransitionError),
}

impl From<ProviderError> for SubmissionError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::UserRejected => Self::UserRejected,
            ProviderError::NotInstalled | ProviderError::NotConnected => {
                Self::ProviderUnavailable(e.to_string())
            }
            ProviderError::NetworkRejected { message, .. } => Self::NetworkRejected(message),
            ProviderError::SendUncertain { signature, reason } => {
                Self::SendUncertain { signature, reason }
            }
            ProviderError::Other(message) => Self::Unknown(message),
        }
    }
}

#[derive(Debug, Error)]
pub enum KeystoreError {
    #[error("key error: {0}")]
    Key(String),

    #[error("decryption failed: wrong password or corrupted data")]
    Decrypt,

    #[error("unsupported keystore version: {0}")]
    UnsupportedVersion(u32),

    #[error("keystore address {stored} does not match decrypted key {derived}")]
    AddressMismatch {
        stored: ChainAddress,
        derived: ChainAddress,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
