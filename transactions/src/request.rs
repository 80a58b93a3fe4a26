//! The validated contribution request.

use bos_types::{ChainAddress, Decimal, RecordId};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::validation::{validate_address, validate_amount};

/// Longest contributor note accepted, in characters.
pub const MAX_MESSAGE_LEN: usize = 280;

/// One user submission: who to credit, where the funds go, how much.
///
/// Only constructible through validation, so `amount > 0` and a well-formed
/// recipient always hold. The same `amount` is carried through building,
/// submission and reconciliation unchanged.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionRequest {
    target_record_id: RecordId,
    recipient_address: ChainAddress,
    amount: Decimal,
    message: Option<String>,
}

impl ContributionRequest {
    pub fn new(
        target_record_id: RecordId,
        recipient_address: ChainAddress,
        amount: Decimal,
        message: Option<String>,
    ) -> Result<Self, ValidationError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(ValidationError::NegativeAmount);
        }
        if amount.is_zero() {
            return Err(ValidationError::ZeroAmount);
        }
        Ok(Self {
            target_record_id,
            recipient_address,
            amount,
            message: normalize_message(message)?,
        })
    }

    /// Validate raw form input into a request.
    pub fn parse(
        target_record_id: &str,
        recipient: &str,
        amount: &str,
        message: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let target_record_id =
            RecordId::new(target_record_id).map_err(|_| ValidationError::MissingRecordId)?;
        let recipient_address = validate_address(recipient)?;
        let amount = validate_amount(amount)?;
        Self::new(
            target_record_id,
            recipient_address,
            amount,
            message.map(str::to_string),
        )
    }

    pub fn target_record_id(&self) -> &RecordId {
        &self.target_record_id
    }

    pub fn recipient_address(&self) -> &ChainAddress {
        &self.recipient_address
    }

    /// Amount in SOL.
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

fn normalize_message(message: Option<String>) -> Result<Option<String>, ValidationError> {
    let Some(message) = message else {
        return Ok(None);
    };
    let trimmed = message.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.chars().count() > MAX_MESSAGE_LEN {
        return Err(ValidationError::MessageTooLong {
            max: MAX_MESSAGE_LEN,
        });
    }
    Ok(Some(trimmed.to_string()))
}
