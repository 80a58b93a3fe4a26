//! The transfer transaction and its status machine.

use bos_types::{ChainAddress, Decimal, FreshnessToken, Lamports, Signature};
use serde::{Deserialize, Serialize};

use crate::error::{TransitionError, ValidationError};
use crate::message::TransferMessage;

/// Where a transaction is in its life.
///
/// `Built` is the only status without a signature.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TxStatus {
    Built,
    Signed,
    Submitted,
    Confirmed,
    Failed,
}

/// A single native-coin transfer from the contributor to the bounty wallet.
///
/// Fields are private so that status changes go through the `mark_*` methods,
/// which keep `signature` set exactly when the status is past `Built`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    from: ChainAddress,
    to: ChainAddress,
    lamports: Lamports,
    amount: Decimal,
    freshness: FreshnessToken,
    signature: Option<Signature>,
    status: TxStatus,
}

impl Transaction {
    /// Create an unsigned transaction. `lamports` must be non-zero.
    ///
    /// `amount` is the validated SOL value the lamports were derived from; it rides
    /// along so that reconciliation credits exactly what was built.
    pub fn new(
        from: ChainAddress,
        to: ChainAddress,
        lamports: Lamports,
        amount: Decimal,
        freshness: FreshnessToken,
    ) -> Result<Self, ValidationError> {
        if lamports.is_zero() {
            return Err(ValidationError::ZeroAmount);
        }
        Ok(Self {
            from,
            to,
            lamports,
            amount,
            freshness,
            signature: None,
            status: TxStatus::Built,
        })
    }

    pub fn from(&self) -> &ChainAddress {
        &self.from
    }

    pub fn to(&self) -> &ChainAddress {
        &self.to
    }

    pub fn lamports(&self) -> Lamports {
        self.lamports
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn freshness(&self) -> &FreshnessToken {
        &self.freshness
    }

    pub fn signature(&self) -> Option<&Signature> {
        self.signature.as_ref()
    }

    pub fn status(&self) -> TxStatus {
        self.status
    }

    /// The message a signer signs.
    pub fn message(&self) -> TransferMessage {
        TransferMessage {
            from: self.from,
            to: self.to,
            lamports: self.lamports,
            recent_blockhash: self.freshness.blockhash,
        }
    }

    /// Serialized message bytes, the exact input to Ed25519 signing.
    pub fn message_bytes(&self) -> Vec<u8> {
        self.message().serialize()
    }

    /// Built → Signed.
    pub fn mark_signed(&mut self, signature: Signature) -> Result<(), TransitionError> {
        self.transition(&[TxStatus::Built], TxStatus::Signed)?;
        self.signature = Some(signature);
        Ok(())
    }

    /// Built or Signed → Submitted.
    ///
    /// A combined sign-and-send call goes straight from Built. The signature
    /// returned by the broadcast replaces any earlier one.
    pub fn mark_submitted(&mut self, signature: Signature) -> Result<(), TransitionError> {
        self.transition(&[TxStatus::Built, TxStatus::Signed], TxStatus::Submitted)?;
        self.signature = Some(signature);
        Ok(())
    }

    /// Submitted → Confirmed.
    pub fn mark_confirmed(&mut self) -> Result<(), TransitionError> {
        self.transition(&[TxStatus::Submitted], TxStatus::Confirmed)
    }

    /// Signed or Submitted → Failed.
    pub fn mark_failed(&mut self) -> Result<(), TransitionError> {
        self.transition(&[TxStatus::Signed, TxStatus::Submitted], TxStatus::Failed)
    }

    fn transition(&mut self, allowed: &[TxStatus], to: TxStatus) -> Result<(), TransitionError> {
        if !allowed.contains(&self.status) {
            return Err(TransitionError {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }
}
