//! The contribution flow: one attempt from request to credited bounty.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bos_rpc::{ChainClient, Commitment};
use bos_store::{BountyStore, PendingBounties};
use bos_transactions::{ContributionRequest, Transaction};
use bos_types::{BountyTotal, ChainAddress, Decimal, RecordId, Signature};
use bos_wallet_core::{SubmissionError, SubmissionGateway, TransactionBuilder, WalletSession};
use tracing::{error, info, warn};

use crate::cancel::CancelHandle;
use crate::config::BountyConfig;
use crate::error::{FlowError, JournalError, ReconcileError, WatchError};
use crate::journal::{Journal, JournalEntry, JournalStage};
use crate::outcome::Outcome;
use crate::reconciler::Reconciler;
use crate::watcher::ConfirmationWatcher;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlowSettings {
    pub commitment: Commitment,
    pub confirmation_timeout: Duration,
    pub poll_interval: Duration,
    pub preflight_balance_check: bool,
}

impl FlowSettings {
    pub fn from_config(config: &BountyConfig) -> Self {
        Self {
            commitment: config.commitment,
            confirmation_timeout: config.confirmation_timeout(),
            poll_interval: config.poll_interval(),
            preflight_balance_check: config.preflight_balance_check,
        }
    }
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self::from_config(&BountyConfig::default())
    }
}

/// How an attempt ended when it did not end in an error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContributionResult {
    /// Confirmed on chain and credited to the bounty.
    Credited {
        signature: Signature,
        total: BountyTotal,
    },
    /// The transfer was credited by an earlier call.
    AlreadyCredited { signature: Signature },
    /// Submitted but not settled yet (wait timed out or was cancelled).
    /// Re-check with [`ContributionFlow::resume`] before building another
    /// transaction.
    Pending { signature: Signature },
    /// The transfer landed with an error; the bounty is untouched.
    Failed { signature: Signature, reason: String },
}

impl ContributionResult {
    pub fn signature(&self) -> &Signature {
        match self {
            Self::Credited { signature, .. }
            | Self::AlreadyCredited { signature }
            | Self::Pending { signature }
            | Self::Failed { signature, .. } => signature,
        }
    }
}

pub struct ContributionFlow {
    session: WalletSession,
    builder: TransactionBuilder,
    gateway: SubmissionGateway,
    watcher: ConfirmationWatcher,
    reconciler: Reconciler,
    store: Arc<dyn BountyStore>,
    journal: Arc<dyn Journal>,
    overlay: Mutex<PendingBounties>,
    in_flight: Mutex<HashSet<RecordId>>,
    /// Credited to the total, but the journal could not be moved to
    /// `TotalApplied`. Only covers this process.
    unjournaled_gaps: Mutex<HashSet<Signature>>,
    confirmation_timeout: Duration,
}

impl ContributionFlow {
    pub fn new(
        session: WalletSession,
        chain: Arc<dyn ChainClient>,
        store: Arc<dyn BountyStore>,
        journal: Arc<dyn Journal>,
        settings: FlowSettings,
    ) -> Self {
        let builder = TransactionBuilder::new(chain.clone(), session.clone())
            .with_preflight_balance(settings.preflight_balance_check);
        let gateway = SubmissionGateway::new(session.provider().cloned());
        Self {
            builder,
            gateway,
            watcher: ConfirmationWatcher::new(chain, settings.commitment, settings.poll_interval),
            reconciler: Reconciler::new(store.clone()),
            session,
            store,
            journal,
            overlay: Mutex::new(PendingBounties::new()),
            in_flight: Mutex::new(HashSet::new()),
            unjournaled_gaps: Mutex::new(HashSet::new()),
            confirmation_timeout: settings.confirmation_timeout,
        }
    }

    pub fn session(&self) -> &WalletSession {
        &self.session
    }

    /// Validate raw form input, then [`contribute`](Self::contribute).
    pub async fn contribute_raw(
        &self,
        record_id: &str,
        recipient: &str,
        amount: &str,
        message: Option<&str>,
    ) -> Result<ContributionResult, FlowError> {
        let request = ContributionRequest::parse(record_id, recipient, amount, message)?;
        self.contribute(request).await
    }

    pub async fn contribute(&self, request: ContributionRequest) -> Result<ContributionResult, FlowError> {
        self.contribute_with_cancel(request, &CancelHandle::new()).await
    }

    /// Run one attempt. `cancel` stops the confirmation wait early; the
    /// attempt then ends as `Pending`.
    pub async fn contribute_with_cancel(
        &self,
        request: ContributionRequest,
        cancel: &CancelHandle,
    ) -> Result<ContributionResult, FlowError> {
        let id = request.target_record_id().clone();
        let _guard = self.begin(&id)?;

        if self.store.get_record(&id).await?.is_none() {
            return Err(FlowError::RecordNotFound(id));
        }

        let contributor = self.session.ensure_connected().await?;
        let mut tx = self
            .builder
            .build(&contributor, request.recipient_address(), request.amount())
            .await?;

        let signature = match self.gateway.sign_and_submit(&mut tx).await {
            Ok(signature) => signature,
            Err(SubmissionError::SendUncertain { signature, reason }) => {
                // Signed, so it may still land: track it like any submission.
                warn!(signature = %signature, record = %id, reason = %reason, "tracking unacknowledged transfer");
                signature
            }
            Err(e) => {
                let err = FlowError::from(e);
                if err.is_user_cancellation() {
                    info!(record = %id, "contribution cancelled by user");
                }
                return Err(err);
            }
        };

        let entry = JournalEntry::submitted(signature, request.clone(), contributor, tx.lamports());
        if let Err(e) = self.journal.record(entry) {
            // Keep going; the wait below is still worth doing.
            error!(signature = %signature, record = %id, error = %e, "failed to journal submitted transfer");
        }
        self.lock_overlay().stage(signature, id.clone(), request.amount());

        let outcome = match self
            .watcher
            .await_confirmation_cancellable(&signature, self.confirmation_timeout, cancel)
            .await
        {
            Ok(outcome) => outcome,
            Err(WatchError::Cancelled) => Outcome::TimedOut,
            Err(e) => return Err(e.into()),
        };
        self.finish(&request, &signature, &contributor, outcome, Some(&mut tx))
            .await
    }

    /// Re-check a journaled signature once and settle it if its outcome is
    /// known. Never builds or sends a new transaction.
    ///
    /// Abandoned entries are checked too: a transfer that landed after it was
    /// given up on is still credited.
    pub async fn resume(&self, signature: &Signature) -> Result<ContributionResult, FlowError> {
        let entry = self.journal_entry(signature)?;
        let _guard = self.begin(entry.request.target_record_id())?;
        if let Some(done) = self.already_settled(&entry).await? {
            return Ok(done);
        }
        let outcome = self.watcher.check(signature).await?.unwrap_or(Outcome::TimedOut);
        self.finish(&entry.request, signature, &entry.contributor, outcome, None)
            .await
    }

    /// Like [`resume`](Self::resume) but keeps polling up to the configured
    /// confirmation timeout.
    pub async fn resume_and_wait(
        &self,
        signature: &Signature,
        cancel: &CancelHandle,
    ) -> Result<ContributionResult, FlowError> {
        let entry = self.journal_entry(signature)?;
        let _guard = self.begin(entry.request.target_record_id())?;
        if let Some(done) = self.already_settled(&entry).await? {
            return Ok(done);
        }
        let outcome = match self
            .watcher
            .await_confirmation_cancellable(signature, self.confirmation_timeout, cancel)
            .await
        {
            Ok(outcome) => outcome,
            Err(WatchError::Cancelled) => Outcome::TimedOut,
            Err(e) => return Err(e.into()),
        };
        self.finish(&entry.request, signature, &entry.contributor, outcome, None)
            .await
    }

    /// Stop tracking a pending transfer. The chain is not touched; if the
    /// transfer lands later it is only credited by an explicit
    /// [`resume`](Self::resume).
    ///
    /// Only entries still awaiting confirmation can be abandoned. One whose
    /// total is already applied must be repaired with `resume` instead.
    pub fn abandon(&self, signature: &Signature) -> Result<(), FlowError> {
        let entry = self.journal_entry(signature)?;
        if entry.stage != JournalStage::AwaitingConfirmation || self.gap_unjournaled(signature) {
            return Err(FlowError::NotAwaiting(*signature));
        }
        self.journal
            .set_stage(signature, JournalStage::Abandoned, None)
            .map_err(|e| match e {
                JournalError::NotFound(sig) => FlowError::UnknownSignature(sig),
                other => other.into(),
            })?;
        self.lock_overlay().roll_back(signature);
        warn!(signature = %signature, "pending contribution abandoned");
        Ok(())
    }

    /// Journal entries that still need attention.
    pub fn pending(&self) -> Result<Vec<JournalEntry>, FlowError> {
        Ok(self.journal.open_entries()?)
    }

    /// Bounty to display for `record`: the persisted total plus contributions
    /// submitted through this flow that are not settled yet.
    pub fn display_total(&self, record: &RecordId, confirmed: Decimal) -> Decimal {
        self.lock_overlay().display_total(record, confirmed)
    }

    async fn finish(
        &self,
        request: &ContributionRequest,
        signature: &Signature,
        contributor: &ChainAddress,
        outcome: Outcome,
        tx: Option<&mut Transaction>,
    ) -> Result<ContributionResult, FlowError> {
        let id = request.target_record_id();
        match outcome {
            Outcome::Confirmed => {
                if let Some(tx) = tx {
                    if let Err(e) = tx.mark_confirmed() {
                        warn!(signature = %signature, error = %e, "unexpected transaction state");
                    }
                }
                match self
                    .reconciler
                    .reconcile(request, &Outcome::Confirmed, signature, contributor)
                    .await
                {
                    Ok(total) => {
                        self.lock_overlay().settle(signature);
                        self.update_stage(signature, JournalStage::Reconciled, None);
                        Ok(ContributionResult::Credited {
                            signature: *signature,
                            total,
                        })
                    }
                    Err(e @ ReconcileError::RecordingGap { .. }) => {
                        self.lock_overlay().settle(signature);
                        if !self.update_stage(signature, JournalStage::TotalApplied, None) {
                            // The entry still reads AwaitingConfirmation; a
                            // reconcile on resume would increment again.
                            self.lock_gaps().insert(*signature);
                        }
                        Err(e.into())
                    }
                    Err(e) => {
                        error!(
                            signature = %signature,
                            record = %id,
                            amount = %request.amount(),
                            error = %e,
                            "payment confirmed but bounty not credited"
                        );
                        self.lock_overlay().roll_back(signature);
                        Err(e.into())
                    }
                }
            }
            Outcome::Failed(reason) => {
                if let Some(tx) = tx {
                    if let Err(e) = tx.mark_failed() {
                        warn!(signature = %signature, error = %e, "unexpected transaction state");
                    }
                }
                warn!(signature = %signature, record = %id, reason = %reason, "transfer failed on chain");
                self.lock_overlay().roll_back(signature);
                self.update_stage(signature, JournalStage::Failed, Some(reason.clone()));
                Ok(ContributionResult::Failed {
                    signature: *signature,
                    reason,
                })
            }
            Outcome::TimedOut => {
                info!(signature = %signature, record = %id, "transfer still pending");
                Ok(ContributionResult::Pending {
                    signature: *signature,
                })
            }
        }
    }

    async fn already_settled(&self, entry: &JournalEntry) -> Result<Option<ContributionResult>, FlowError> {
        let signature = entry.signature;
        let stage = match entry.stage {
            JournalStage::AwaitingConfirmation if self.gap_unjournaled(&signature) => {
                JournalStage::TotalApplied
            }
            stage => stage,
        };
        match stage {
            JournalStage::AwaitingConfirmation | JournalStage::Abandoned => Ok(None),
            JournalStage::TotalApplied => {
                let total = self
                    .reconciler
                    .complete_gap(&entry.request, &signature, &entry.contributor)
                    .await?;
                self.lock_gaps().remove(&signature);
                self.update_stage(&signature, JournalStage::Reconciled, None);
                Ok(Some(ContributionResult::Credited { signature, total }))
            }
            JournalStage::Reconciled => Ok(Some(ContributionResult::AlreadyCredited { signature })),
            JournalStage::Failed => Ok(Some(ContributionResult::Failed {
                signature,
                reason: entry
                    .failure_reason
                    .clone()
                    .unwrap_or_else(|| "failed on chain".to_string()),
            })),
        }
    }

    fn journal_entry(&self, signature: &Signature) -> Result<JournalEntry, FlowError> {
        self.journal
            .get(signature)?
            .ok_or(FlowError::UnknownSignature(*signature))
    }

    /// Returns whether the journal took the update.
    fn update_stage(&self, signature: &Signature, stage: JournalStage, reason: Option<String>) -> bool {
        match self.journal.set_stage(signature, stage, reason) {
            Ok(()) => true,
            Err(e) => {
                error!(signature = %signature, ?stage, error = %e, "failed to update journal");
                false
            }
        }
    }

    fn gap_unjournaled(&self, signature: &Signature) -> bool {
        self.lock_gaps().contains(signature)
    }

    fn begin(&self, id: &RecordId) -> Result<InFlightGuard<'_>, FlowError> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !in_flight.insert(id.clone()) {
            return Err(FlowError::AttemptInFlight(id.clone()));
        }
        Ok(InFlightGuard {
            set: &self.in_flight,
            id: id.clone(),
        })
    }

    fn lock_overlay(&self) -> std::sync::MutexGuard<'_, PendingBounties> {
        self.overlay.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_gaps(&self) -> std::sync::MutexGuard<'_, HashSet<Signature>> {
        self.unjournaled_gaps.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Marks a record as having an attempt in progress until dropped.
struct InFlightGuard<'a> {
    set: &'a Mutex<HashSet<RecordId>>,
    id: RecordId,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.id);
    }
}
