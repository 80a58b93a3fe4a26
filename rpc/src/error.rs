//! RPC error types.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RpcError {
    #[error("request to node failed: {0}")]
    Transport(String),

    #[error("request to node timed out: {0}")]
    Timeout(String),

    #[error("node returned HTTP {0}")]
    Http(u16),

    /// The node understood the request and refused it (JSON-RPC error object).
    #[error("node rejected request ({code}): {message}")]
    Rejected { code: i64, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl RpcError {
    /// True when the node itself refused the request, as opposed to the request
    /// never arriving or the reply being unreadable.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}
