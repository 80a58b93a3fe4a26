use bos_rpc::RpcError;
use bos_store::StoreError;
use bos_transactions::ValidationError;
use bos_types::{Decimal, RecordId, Signature};
use bos_wallet_core::{BuildError, SessionError, SubmissionError};
use thiserror::Error;

use crate::outcome::Outcome;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WatchError {
    #[error("status read failed: {0}")]
    Rpc(#[from] RpcError),

    #[error("wait cancelled")]
    Cancelled,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    /// Only confirmed transfers are ever credited.
    #[error("refusing to reconcile a transfer that is {0}")]
    NotConfirmed(Outcome),

    #[error("record {0} not found")]
    RecordNotFound(RecordId),

    /// The bounty total was not changed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The total was incremented but the contribution record was not written.
    #[error(
        "payment {signature} succeeded but recording failed \
         (record {record}, amount {amount}): {source}"
    )]
    RecordingGap {
        signature: Signature,
        record: RecordId,
        amount: Decimal,
        source: StoreError,
    },
}

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("no journal entry for {0}")]
    NotFound(Signature),

    #[error("journal IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("journal is corrupted: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(String),

    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// How far a failed attempt got, from the user's point of view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureClass {
    /// No funds moved. Safe to try again.
    NothingHappened,
    /// A transfer may have been broadcast. Re-check before retrying.
    TransferUncertain,
    /// Funds moved; only bookkeeping is behind.
    TransferCompleted,
}

#[derive(Debug, Error)]
pub enum FlowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("a contribution to record {0} is already in progress")]
    AttemptInFlight(RecordId),

    #[error("record {0} not found")]
    RecordNotFound(RecordId),

    #[error("no journal entry for transaction {0}")]
    UnknownSignature(Signature),

    /// Only transfers still awaiting confirmation can be abandoned.
    #[error("transaction {0} is no longer awaiting confirmation")]
    NotAwaiting(Signature),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Submission(#[from] SubmissionError),

    #[error("status read failed: {0}")]
    Watch(#[from] WatchError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Journal(#[from] JournalError),
}

impl FlowError {
    pub fn class(&self) -> FailureClass {
        match self {
            Self::Validation(_)
            | Self::AttemptInFlight(_)
            | Self::RecordNotFound(_)
            | Self::UnknownSignature(_)
            | Self::NotAwaiting(_)
            | Self::Session(_)
            | Self::Build(_)
            | Self::Store(_) => FailureClass::NothingHappened,
            Self::Submission(SubmissionError::Unknown(_) | SubmissionError::SendUncertain { .. }) => {
                FailureClass::TransferUncertain
            }
            Self::Submission(_) => FailureClass::NothingHappened,
            Self::Watch(_) | Self::Journal(_) => FailureClass::TransferUncertain,
            Self::Reconcile(ReconcileError::NotConfirmed(_)) => FailureClass::TransferUncertain,
            Self::Reconcile(_) => FailureClass::TransferCompleted,
        }
    }

    /// The user cancelled in the wallet. Not a failure.
    pub fn is_user_cancellation(&self) -> bool {
        matches!(self, Self::Submission(SubmissionError::UserRejected))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classes() {
        assert_eq!(
            FlowError::Submission(SubmissionError::UserRejected).class(),
            FailureClass::NothingHappened
        );
        assert_eq!(
            FlowError::Submission(SubmissionError::Unknown("?".into())).class(),
            FailureClass::TransferUncertain
        );
        assert_eq!(
            FlowError::Submission(SubmissionError::SendUncertain {
                signature: Signature::new([1u8; 64]),
                reason: "timed out".into(),
            })
            .class(),
            FailureClass::TransferUncertain
        );
        assert_eq!(
            FlowError::Build(BuildError::SelfTransfer).class(),
            FailureClass::NothingHappened
        );
        let gap = ReconcileError::RecordingGap {
            signature: Signature::new([1u8; 64]),
            record: RecordId::new("a").unwrap(),
            amount: Decimal::ONE,
            source: StoreError::Unavailable("down".into()),
        };
        assert_eq!(FlowError::Reconcile(gap).class(), FailureClass::TransferCompleted);
    }

    #[test]
    fn recording_gap_message_names_everything() {
        let sig = Signature::new([1u8; 64]);
        let gap = ReconcileError::RecordingGap {
            signature: sig,
            record: RecordId::new("scam-9").unwrap(),
            amount: Decimal::new(25, 1),
            source: StoreError::Unavailable("down".into()),
        };
        let text = gap.to_string();
        assert!(text.contains(&sig.to_string()));
        assert!(text.contains("scam-9"));
        assert!(text.contains("2.5"));
    }

    #[test]
    fn user_rejection_is_cancellation() {
        assert!(FlowError::Submission(SubmissionError::UserRejected).is_user_cancellation());
        assert!(!FlowError::AttemptInFlight(RecordId::new("a").unwrap()).is_user_cancellation());
    }
}
