//! Credits confirmed transfers to the bounty store.

use std::sync::Arc;

use bos_store::BountyStore;
use bos_transactions::ContributionRequest;
use bos_types::{BountyTotal, ChainAddress, ContributionRecord, Signature, Timestamp};
use tracing::{error, info};

use crate::error::ReconcileError;
use crate::outcome::Outcome;

pub struct Reconciler {
    store: Arc<dyn BountyStore>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn BountyStore>) -> Self {
        Self { store }
    }

    /// Credit `request.amount()` to the target record for a confirmed transfer.
    ///
    /// A signature that already has a contribution record is not credited
    /// again; the current total is returned instead. The increment happens at
    /// the store level before the contribution record is appended; if the
    /// append fails the result is [`ReconcileError::RecordingGap`], which
    /// [`complete_gap`](Self::complete_gap) repairs.
    pub async fn reconcile(
        &self,
        request: &ContributionRequest,
        outcome: &Outcome,
        signature: &Signature,
        contributor: &ChainAddress,
    ) -> Result<BountyTotal, ReconcileError> {
        if !outcome.is_confirmed() {
            return Err(ReconcileError::NotConfirmed(outcome.clone()));
        }
        let id = request.target_record_id();
        let record = self
            .store
            .get_record(id)
            .await?
            .ok_or_else(|| ReconcileError::RecordNotFound(id.clone()))?;

        if self.store.find_contribution_by_signature(signature).await?.is_some() {
            info!(signature = %signature, record = %id, "already reconciled");
            return Ok(record.bounty());
        }

        let total_amount = self.store.increment_bounty_total(id, request.amount()).await?;
        self.append(request, signature, contributor).await?;

        info!(
            signature = %signature,
            record = %id,
            amount = %request.amount(),
            total = %total_amount,
            "contribution reconciled"
        );
        Ok(BountyTotal {
            target_record_id: id.clone(),
            total_amount,
        })
    }

    /// Write the missing contribution record for a transfer whose amount was
    /// already added to the total. Never increments.
    pub async fn complete_gap(
        &self,
        request: &ContributionRequest,
        signature: &Signature,
        contributor: &ChainAddress,
    ) -> Result<BountyTotal, ReconcileError> {
        let id = request.target_record_id();
        if self.store.find_contribution_by_signature(signature).await?.is_none() {
            self.append(request, signature, contributor).await?;
            info!(signature = %signature, record = %id, "recording gap closed");
        }
        let record = self
            .store
            .get_record(id)
            .await?
            .ok_or_else(|| ReconcileError::RecordNotFound(id.clone()))?;
        Ok(record.bounty())
    }

    async fn append(
        &self,
        request: &ContributionRequest,
        signature: &Signature,
        contributor: &ChainAddress,
    ) -> Result<(), ReconcileError> {
        let contribution = ContributionRecord::new(
            request.target_record_id().clone(),
            *contributor,
            request.amount(),
            request.message().map(str::to_string),
            Timestamp::now(),
            *signature,
        );
        self.store
            .append_contribution(&contribution)
            .await
            .map_err(|source| {
                error!(
                    signature = %signature,
                    record = %request.target_record_id(),
                    amount = %request.amount(),
                    error = %source,
                    "payment confirmed but contribution was not recorded"
                );
                ReconcileError::RecordingGap {
                    signature: *signature,
                    record: request.target_record_id().clone(),
                    amount: request.amount(),
                    source,
                }
            })
    }
}
