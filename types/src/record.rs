//! Persisted bounty entities.
//!
//! These are the strongly-typed forms of rows held by the external data store.
//! Raw rows are converted into them once, in `bos_store::raw`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::address::ChainAddress;
use crate::error::TypesError;
use crate::signature::Signature;
use crate::time::Timestamp;

/// Identifier of a scammer listing in the data store.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordId(String);

impl RecordId {
    pub fn new(raw: impl Into<String>) -> Result<Self, TypesError> {
        let s = raw.into();
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(TypesError::EmptyRecordId);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for RecordId {
    type Error = TypesError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RecordId> for String {
    fn from(id: RecordId) -> Self {
        id.0
    }
}

/// A scammer listing, as far as the bounty core is concerned.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScammerRecord {
    pub id: RecordId,
    pub name: String,
    /// Sum of confirmed contributions, in SOL. Never negative.
    pub bounty_total: Decimal,
    /// Wallet that receives bounty contributions, when the listing has one.
    pub bounty_address: Option<ChainAddress>,
}

impl ScammerRecord {
    pub fn bounty(&self) -> BountyTotal {
        BountyTotal {
            target_record_id: self.id.clone(),
            total_amount: self.bounty_total,
        }
    }
}

/// The persisted bounty total of one record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BountyTotal {
    pub target_record_id: RecordId,
    pub total_amount: Decimal,
}

/// An immutable record of one confirmed contribution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionRecord {
    pub id: Uuid,
    pub target_record_id: RecordId,
    pub contributor_address: ChainAddress,
    pub amount: Decimal,
    pub message: Option<String>,
    pub timestamp: Timestamp,
    pub transaction_signature: Signature,
}

impl ContributionRecord {
    /// Create a record with a fresh random id.
    pub fn new(
        target_record_id: RecordId,
        contributor_address: ChainAddress,
        amount: Decimal,
        message: Option<String>,
        timestamp: Timestamp,
        transaction_signature: Signature,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            target_record_id,
            contributor_address,
            amount,
            message,
            timestamp,
            transaction_signature,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_id_trims_and_rejects_empty() {
        assert_eq!(RecordId::new("  abc ").unwrap().as_str(), "abc");
        assert_eq!(RecordId::new("   "), Err(TypesError::EmptyRecordId));
    }

    #[test]
    fn contribution_ids_are_unique() {
        let make = || {
            ContributionRecord::new(
                RecordId::new("r1").unwrap(),
                ChainAddress::new([1u8; 32]),
                Decimal::ONE,
                None,
                Timestamp::new(1),
                Signature::new([2u8; 64]),
            )
        };
        assert_ne!(make().id, make().id);
    }
}
