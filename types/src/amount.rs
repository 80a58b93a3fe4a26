//! Native coin amounts.
//!
//! Human-facing amounts are decimals in SOL (major units). Everything that goes on
//! chain is an integer number of lamports. Conversion truncates any fractional
//! lamport, so callers must treat 10^-9 SOL as the precision boundary.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;

use crate::error::TypesError;

/// Number of fractional digits of the native coin.
pub const SOL_DECIMALS: u32 = 9;

/// Lamports per SOL.
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// An amount in lamports, the indivisible base unit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Lamports(u64);

impl Lamports {
    pub const ZERO: Self = Self(0);

    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Convert a SOL amount to lamports, truncating sub-lamport remainders.
    ///
    /// A positive amount below one lamport yields `Lamports::ZERO`; rejecting that
    /// is the caller's job.
    pub fn from_sol(amount: Decimal) -> Result<Self, TypesError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(TypesError::NegativeAmount);
        }
        let scaled = amount
            .checked_mul(Decimal::from(LAMPORTS_PER_SOL))
            .ok_or(TypesError::AmountOverflow)?
            .trunc();
        scaled
            .to_u64()
            .map(Self)
            .ok_or(TypesError::AmountOverflow)
    }

    /// The exact SOL value of this amount.
    pub fn to_sol(&self) -> Decimal {
        Decimal::from_i128_with_scale(i128::from(self.0), SOL_DECIMALS).normalize()
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }
}

impl Add for Lamports {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl fmt::Display for Lamports {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} lamports", self.0)
    }
}
