//! Confirmation watcher.
//!
//! Polls the chain for a signature until it reaches the configured commitment,
//! fails on chain, or the wait times out. Terminal outcomes are cached so a
//! signature that was once confirmed (or failed) always reports the same
//! outcome again without another round trip.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bos_rpc::{ChainClient, Commitment, SignatureStatus};
use bos_types::Signature;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cancel::CancelHandle;
use crate::error::WatchError;
use crate::outcome::Outcome;

/// Terminal outcomes remembered per watcher.
const TERMINAL_CACHE_CAPACITY: usize = 1024;

pub struct ConfirmationWatcher {
    chain: Arc<dyn ChainClient>,
    commitment: Commitment,
    poll_interval: Duration,
    terminal: Mutex<TerminalCache>,
}

impl ConfirmationWatcher {
    pub fn new(chain: Arc<dyn ChainClient>, commitment: Commitment, poll_interval: Duration) -> Self {
        Self {
            chain,
            commitment,
            poll_interval,
            terminal: Mutex::new(TerminalCache::new(TERMINAL_CACHE_CAPACITY)),
        }
    }

    pub fn commitment(&self) -> Commitment {
        self.commitment
    }

    /// One status read. `Ok(None)` means not yet settled at the configured
    /// commitment.
    pub async fn check(&self, signature: &Signature) -> Result<Option<Outcome>, WatchError> {
        if let Some(outcome) = self.cached(signature) {
            return Ok(Some(outcome));
        }
        let status = self.chain.get_signature_status(signature).await?;
        Ok(self.settle(signature, status))
    }

    /// Poll until a terminal outcome or `timeout`.
    ///
    /// Status read errors are logged and polling continues. A timeout is not
    /// cached: the transfer may still land and a later check can see it.
    pub async fn await_confirmation(&self, signature: &Signature, timeout: Duration) -> Outcome {
        if let Some(outcome) = self.cached(signature) {
            return outcome;
        }
        let started = Instant::now();
        let deadline = started + timeout;
        loop {
            match self.chain.get_signature_status(signature).await {
                Ok(status) => {
                    if let Some(outcome) = self.settle(signature, status) {
                        debug!(
                            signature = %signature,
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            outcome = %outcome,
                            "confirmation settled"
                        );
                        return outcome;
                    }
                }
                Err(e) => warn!(signature = %signature, error = %e, "status poll failed; retrying"),
            }

            let now = Instant::now();
            if now >= deadline {
                warn!(signature = %signature, timeout_secs = timeout.as_secs(), "confirmation wait timed out");
                return Outcome::TimedOut;
            }
            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
        }
    }

    /// Like [`await_confirmation`](Self::await_confirmation), but stops early
    /// when `cancel` fires. Cancelling only stops local polling.
    pub async fn await_confirmation_cancellable(
        &self,
        signature: &Signature,
        timeout: Duration,
        cancel: &CancelHandle,
    ) -> Result<Outcome, WatchError> {
        tokio::select! {
            outcome = self.await_confirmation(signature, timeout) => Ok(outcome),
            _ = cancel.cancelled() => {
                info!(signature = %signature, "confirmation wait cancelled");
                Err(WatchError::Cancelled)
            }
        }
    }

    fn cached(&self, signature: &Signature) -> Option<Outcome> {
        self.lock().get(signature).cloned()
    }

    fn settle(&self, signature: &Signature, status: Option<SignatureStatus>) -> Option<Outcome> {
        let outcome = classify(status?, self.commitment)?;
        self.lock().insert(*signature, outcome.clone());
        Some(outcome)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TerminalCache> {
        self.terminal.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Map a node status to a terminal outcome, or `None` if still in progress.
///
/// An execution error only counts once it is settled at `commitment`; below
/// that the block can still be dropped and the transfer land elsewhere.
fn classify(status: SignatureStatus, commitment: Commitment) -> Option<Outcome> {
    if !status.reached(commitment) {
        return None;
    }
    Some(match status.failure_reason() {
        Some(reason) => Outcome::Failed(reason),
        None => Outcome::Confirmed,
    })
}

/// Bounded FIFO map: when full, the oldest entry is evicted.
struct TerminalCache {
    outcomes: HashMap<Signature, Outcome>,
    order: VecDeque<Signature>,
    capacity: usize,
}

impl TerminalCache {
    fn new(capacity: usize) -> Self {
        Self {
            outcomes: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// First write wins; terminal outcomes never change.
    fn insert(&mut self, signature: Signature, outcome: Outcome) {
        if self.capacity == 0 || self.outcomes.contains_key(&signature) {
            return;
        }
        if self.order.len() >= self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.outcomes.remove(&evicted);
            }
        }
        self.outcomes.insert(signature, outcome);
        self.order.push_back(signature);
    }

    fn get(&self, signature: &Signature) -> Option<&Outcome> {
        self.outcomes.get(signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bos_nullables::NullChain;
    use bos_rpc::RpcError;
    use serde_json::json;

    fn sig(b: u8) -> Signature {
        Signature::new([b; 64])
    }

    fn watcher(chain: Arc<NullChain>) -> ConfirmationWatcher {
        ConfirmationWatcher::new(chain, Commitment::Confirmed, Duration::from_millis(5))
    }

    #[test]
    fn classification() {
        let c = Commitment::Confirmed;
        assert_eq!(
            classify(SignatureStatus::success(1, Commitment::Processed), c),
            None
        );
        assert_eq!(
            classify(SignatureStatus::success(1, Commitment::Finalized), c),
            Some(Outcome::Confirmed)
        );
        assert!(matches!(
            classify(SignatureStatus::failure(1, json!({"InstructionError": [0, "Custom"]})), c),
            Some(Outcome::Failed(_))
        ));
        assert_eq!(classify(unsettled_failure("AccountInUse"), c), None);
    }

    fn unsettled_failure(reason: &str) -> SignatureStatus {
        SignatureStatus {
            confirmations: Some(0),
            confirmation_status: Some(Commitment::Processed),
            ..SignatureStatus::failure(4, json!(reason))
        }
    }

    #[test]
    fn cache_evicts_oldest() {
        let mut cache = TerminalCache::new(2);
        cache.insert(sig(1), Outcome::Confirmed);
        cache.insert(sig(2), Outcome::Confirmed);
        cache.insert(sig(3), Outcome::Failed("x".into()));
        assert!(cache.get(&sig(1)).is_none());
        assert!(cache.get(&sig(3)).is_some());
    }

    #[test]
    fn cache_first_write_wins() {
        let mut cache = TerminalCache::new(2);
        cache.insert(sig(1), Outcome::Confirmed);
        cache.insert(sig(1), Outcome::Failed("late".into()));
        assert_eq!(cache.get(&sig(1)), Some(&Outcome::Confirmed));
    }

    #[tokio::test]
    async fn confirms_once_commitment_is_reached() {
        let chain = Arc::new(NullChain::new());
        chain.set_status(sig(1), Some(SignatureStatus::success(5, Commitment::Confirmed)));
        let w = watcher(chain);
        assert_eq!(
            w.await_confirmation(&sig(1), Duration::from_secs(1)).await,
            Outcome::Confirmed
        );
    }

    #[tokio::test]
    async fn times_out_when_never_seen() {
        let chain = Arc::new(NullChain::new());
        let w = watcher(chain.clone());
        assert_eq!(
            w.await_confirmation(&sig(1), Duration::from_millis(40)).await,
            Outcome::TimedOut
        );
        assert!(chain.status_polls(&sig(1)) >= 2);
        assert_eq!(w.check(&sig(1)).await, Ok(None));
    }

    #[tokio::test]
    async fn transient_errors_keep_polling() {
        let chain = Arc::new(NullChain::new());
        chain.fail_status_reads([RpcError::Http(502), RpcError::Timeout("slow".into())]);
        chain.set_status(sig(1), Some(SignatureStatus::success(5, Commitment::Finalized)));
        let w = watcher(chain.clone());
        assert_eq!(
            w.await_confirmation(&sig(1), Duration::from_secs(1)).await,
            Outcome::Confirmed
        );
        assert_eq!(chain.status_polls(&sig(1)), 3);
    }

    #[tokio::test]
    async fn terminal_outcome_is_cached() {
        let chain = Arc::new(NullChain::new());
        chain.set_status(sig(1), Some(SignatureStatus::failure(5, json!("BlockhashNotFound"))));
        let w = watcher(chain.clone());

        let first = w.await_confirmation(&sig(1), Duration::from_secs(1)).await;
        assert_eq!(first, Outcome::Failed("BlockhashNotFound".into()));

        // The node forgetting the signature changes nothing.
        chain.set_status(sig(1), None);
        assert_eq!(w.await_confirmation(&sig(1), Duration::from_secs(1)).await, first);
        assert_eq!(w.check(&sig(1)).await, Ok(Some(first)));
        assert_eq!(chain.status_polls(&sig(1)), 1);
    }

    #[tokio::test]
    async fn processed_error_is_not_final() {
        let chain = Arc::new(NullChain::new());
        chain.set_status(sig(1), Some(unsettled_failure("AccountInUse")));
        let w = watcher(chain.clone());

        assert_eq!(w.check(&sig(1)).await, Ok(None));
        assert_eq!(
            w.await_confirmation(&sig(1), Duration::from_millis(20)).await,
            Outcome::TimedOut
        );

        // The fork carrying the error was dropped; the transfer landed cleanly.
        chain.set_status(sig(1), Some(SignatureStatus::success(6, Commitment::Confirmed)));
        assert_eq!(w.check(&sig(1)).await, Ok(Some(Outcome::Confirmed)));
    }

    #[tokio::test]
    async fn check_surfaces_rpc_errors() {
        let chain = Arc::new(NullChain::new());
        chain.fail_status_reads([RpcError::Http(503)]);
        let w = watcher(chain);
        assert_eq!(w.check(&sig(1)).await, Err(WatchError::Rpc(RpcError::Http(503))));
    }

    #[tokio::test]
    async fn cancel_stops_waiting() {
        let chain = Arc::new(NullChain::new());
        let w = watcher(chain);
        let cancel = CancelHandle::new();
        let remote = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            remote.cancel();
        });
        let result = w
            .await_confirmation_cancellable(&sig(1), Duration::from_secs(30), &cancel)
            .await;
        assert_eq!(result, Err(WatchError::Cancelled));
    }
}
