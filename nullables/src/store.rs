//! Nullable bounty store: thread-safe in-memory storage for testing.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use bos_store::{BountyStore, StoreError};
use bos_types::{ContributionRecord, Decimal, RecordId, ScammerRecord, Signature};

/// In-memory store. Increments happen under a single lock, which makes them
/// atomic the same way the hosted store's server-side function is.
pub struct NullBountyStore {
    records: Mutex<HashMap<RecordId, ScammerRecord>>,
    contributions: Mutex<Vec<ContributionRecord>>,
    append_failures: Mutex<VecDeque<StoreError>>,
    increment_failures: Mutex<VecDeque<StoreError>>,
    increments: Mutex<u32>,
}

impl NullBountyStore {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            contributions: Mutex::new(Vec::new()),
            append_failures: Mutex::new(VecDeque::new()),
            increment_failures: Mutex::new(VecDeque::new()),
            increments: Mutex::new(0),
        }
    }

    pub fn insert_record(&self, record: ScammerRecord) {
        self.records.lock().unwrap().insert(record.id.clone(), record);
    }

    pub fn record(&self, id: &RecordId) -> Option<ScammerRecord> {
        self.records.lock().unwrap().get(id).cloned()
    }

    pub fn contributions(&self) -> Vec<ContributionRecord> {
        self.contributions.lock().unwrap().clone()
    }

    /// Successful increments so far.
    pub fn increment_count(&self) -> u32 {
        *self.increments.lock().unwrap()
    }

    /// The next `append_contribution` fails with `error`.
    pub fn fail_next_append(&self, error: StoreError) {
        self.append_failures.lock().unwrap().push_back(error);
    }

    /// The next `increment_bounty_total` fails with `error`.
    pub fn fail_next_increment(&self, error: StoreError) {
        self.increment_failures.lock().unwrap().push_back(error);
    }
}

impl Default for NullBountyStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BountyStore for NullBountyStore {
    async fn get_record(&self, id: &RecordId) -> Result<Option<ScammerRecord>, StoreError> {
        Ok(self.record(id))
    }

    async fn increment_bounty_total(&self, id: &RecordId, delta: Decimal) -> Result<Decimal, StoreError> {
        // Yield first so concurrent callers interleave before taking the lock.
        tokio::task::yield_now().await;
        if let Some(e) = self.increment_failures.lock().unwrap().pop_front() {
            return Err(e);
        }
        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("record {id}")))?;
        record.bounty_total += delta;
        *self.increments.lock().unwrap() += 1;
        Ok(record.bounty_total)
    }

    async fn append_contribution(&self, record: &ContributionRecord) -> Result<(), StoreError> {
        if let Some(e) = self.append_failures.lock().unwrap().pop_front() {
            return Err(e);
        }
        let mut contributions = self.contributions.lock().unwrap();
        if contributions
            .iter()
            .any(|c| c.transaction_signature == record.transaction_signature)
        {
            return Err(StoreError::Duplicate(format!(
                "contribution {}",
                record.transaction_signature
            )));
        }
        contributions.push(record.clone());
        Ok(())
    }

    async fn find_contribution_by_signature(
        &self,
        signature: &Signature,
    ) -> Result<Option<ContributionRecord>, StoreError> {
        Ok(self
            .contributions
            .lock()
            .unwrap()
            .iter()
            .find(|c| &c.transaction_signature == signature)
            .cloned())
    }
}
