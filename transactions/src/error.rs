use thiserror::Error;

use crate::transaction::TxStatus;

/// Malformed user input. Always recoverable by re-entry; nothing has happened yet.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("amount is empty")]
    EmptyAmount,

    #[error("amount must not be negative")]
    NegativeAmount,

    #[error("amount must be greater than zero")]
    ZeroAmount,

    #[error("amount is not a decimal number: {0}")]
    MalformedAmount(String),

    #[error("amount is out of range")]
    AmountOutOfRange,

    #[error("malformed address: {0}")]
    MalformedAddress(String),

    #[error("record id must not be empty")]
    MissingRecordId,

    #[error("message exceeds {max} characters")]
    MessageTooLong { max: usize },
}

/// An illegal status change on a `Transaction`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("transaction cannot move from {from:?} to {to:?}")]
pub struct TransitionError {
    pub from: TxStatus,
    pub to: TxStatus,
}
