//! Top-level error type for parsing and converting fundamental types.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypesError {
    #[error("invalid base58: {0}")]
    Base58(String),

    #[error("expected {expected} bytes, got {actual}")]
    Length { expected: usize, actual: usize },

    #[error("amount is negative")]
    NegativeAmount,

    #[error("amount does not fit in u64 lamports")]
    AmountOverflow,

    #[error("record id must not be empty")]
    EmptyRecordId,

    #[error("unknown cluster: {0}")]
    UnknownCluster(String),
}
