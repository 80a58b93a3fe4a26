//! Input validation that runs before any wallet prompt or network call.
//!
//! The UI already restricts keystrokes, but nothing here relies on that.

use bos_types::{ChainAddress, Decimal};
use std::str::FromStr;

use crate::error::ValidationError;

/// Most significant digits a contribution amount may carry.
const MAX_SIGNIFICANT_DIGITS: usize = 28;

/// Validate a user-entered SOL amount.
///
/// Grammar: optional integer digits, optional single `.`, optional fraction digits,
/// with at least one digit overall. Surrounding whitespace is ignored. Zero is
/// rejected; sub-lamport precision is accepted here and rejected by the builder.
pub fn validate_amount(raw: &str) -> Result<Decimal, ValidationError> {
    let s = raw.trim();
    if s.is_empty() {
        return Err(ValidationError::EmptyAmount);
    }
    if s.starts_with('-') {
        return Err(ValidationError::NegativeAmount);
    }

    let mut points = 0usize;
    let mut digits = 0usize;
    for c in s.chars() {
        match c {
            '0'..='9' => digits += 1,
            '.' => points += 1,
            other => {
                return Err(ValidationError::MalformedAmount(format!(
                    "unexpected character {other:?}"
                )))
            }
        }
    }
    if points > 1 {
        return Err(ValidationError::MalformedAmount(
            "more than one decimal point".into(),
        ));
    }
    if digits == 0 {
        return Err(ValidationError::MalformedAmount("no digits".into()));
    }

    let (int_part, frac_part) = s.split_once('.').unwrap_or((s, ""));
    let int_part = int_part.trim_start_matches('0');
    if int_part.len() + frac_part.len() > MAX_SIGNIFICANT_DIGITS {
        return Err(ValidationError::AmountOutOfRange);
    }

    let normalized = match (int_part.is_empty(), frac_part.is_empty()) {
        (true, true) => "0".to_string(),
        (true, false) => format!("0.{frac_part}"),
        (false, true) => int_part.to_string(),
        (false, false) => format!("{int_part}.{frac_part}"),
    };
    let amount =
        Decimal::from_str(&normalized).map_err(|_| ValidationError::AmountOutOfRange)?;
    if amount.is_zero() {
        return Err(ValidationError::ZeroAmount);
    }
    Ok(amount)
}

/// Validate a recipient address against the chain's base58 address grammar.
pub fn validate_address(raw: &str) -> Result<ChainAddress, ValidationError> {
    ChainAddress::parse(raw.trim()).map_err(|e| ValidationError::MalformedAddress(e.to_string()))
}
