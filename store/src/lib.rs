//! Bounty data store contract.
//!
//! The hosted backend (and the in-memory test double) implement
//! [`BountyStore`]. The rest of the codebase depends only on the trait.

pub mod error;
pub mod pending;
pub mod raw;

use async_trait::async_trait;
use bos_types::{ContributionRecord, Decimal, RecordId, ScammerRecord, Signature};

pub use error::StoreError;
pub use pending::{PendingBounties, PendingEntry};

#[async_trait]
pub trait BountyStore: Send + Sync {
    /// Fetch a scammer record. `Ok(None)` when no such record exists.
    async fn get_record(&self, id: &RecordId) -> Result<Option<ScammerRecord>, StoreError>;

    /// Add `delta` to the record's bounty total atomically at the store level
    /// and return the new total. Concurrent increments must never be lost.
    async fn increment_bounty_total(&self, id: &RecordId, delta: Decimal) -> Result<Decimal, StoreError>;

    /// Append a contribution. A second record with the same transaction
    /// signature is rejected with [`StoreError::Duplicate`].
    async fn append_contribution(&self, record: &ContributionRecord) -> Result<(), StoreError>;

    async fn find_contribution_by_signature(
        &self,
        signature: &Signature,
    ) -> Result<Option<ContributionRecord>, StoreError>;
}
