//! Signature journal.
//!
//! Every submitted signature is written down before the flow starts waiting on
//! it, together with everything needed to reconcile it later. If the process
//! dies or the wait times out, the journal is how the transfer is found again.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use bos_transactions::ContributionRequest;
use bos_types::{ChainAddress, Lamports, Signature, Timestamp};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::JournalError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JournalStage {
    /// Submitted; outcome not yet known or not yet reconciled.
    AwaitingConfirmation,
    /// Confirmed and the bounty total incremented, but the contribution record
    /// is missing.
    TotalApplied,
    Reconciled,
    Failed,
    /// Given up on by the user.
    Abandoned,
}

impl JournalStage {
    /// Still needs attention.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::AwaitingConfirmation | Self::TotalApplied)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub signature: Signature,
    pub request: ContributionRequest,
    pub contributor: ChainAddress,
    pub lamports: Lamports,
    pub submitted_at: Timestamp,
    pub stage: JournalStage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl JournalEntry {
    pub fn submitted(
        signature: Signature,
        request: ContributionRequest,
        contributor: ChainAddress,
        lamports: Lamports,
    ) -> Self {
        Self {
            signature,
            request,
            contributor,
            lamports,
            submitted_at: Timestamp::now(),
            stage: JournalStage::AwaitingConfirmation,
            failure_reason: None,
        }
    }
}

pub trait Journal: Send + Sync {
    /// Insert or replace the entry for `entry.signature`.
    fn record(&self, entry: JournalEntry) -> Result<(), JournalError>;

    fn get(&self, signature: &Signature) -> Result<Option<JournalEntry>, JournalError>;

    /// Move an existing entry to `stage`.
    fn set_stage(
        &self,
        signature: &Signature,
        stage: JournalStage,
        failure_reason: Option<String>,
    ) -> Result<(), JournalError>;

    /// Entries that still need attention, oldest first.
    fn open_entries(&self) -> Result<Vec<JournalEntry>, JournalError>;
}

type Entries = BTreeMap<String, JournalEntry>;

fn update_stage(
    entries: &mut Entries,
    signature: &Signature,
    stage: JournalStage,
    failure_reason: Option<String>,
) -> Result<(), JournalError> {
    let entry = entries
        .get_mut(&signature.to_string())
        .ok_or(JournalError::NotFound(*signature))?;
    entry.stage = stage;
    entry.failure_reason = failure_reason;
    Ok(())
}

fn open_sorted(entries: &Entries) -> Vec<JournalEntry> {
    let mut open: Vec<JournalEntry> = entries
        .values()
        .filter(|e| e.stage.is_open())
        .cloned()
        .collect();
    open.sort_by_key(|e| e.submitted_at);
    open
}

/// In-memory journal for tests and embedding.
#[derive(Default)]
pub struct MemoryJournal {
    entries: Mutex<Entries>,
}

impl MemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Journal for MemoryJournal {
    fn record(&self, entry: JournalEntry) -> Result<(), JournalError> {
        self.lock().insert(entry.signature.to_string(), entry);
        Ok(())
    }

    fn get(&self, signature: &Signature) -> Result<Option<JournalEntry>, JournalError> {
        Ok(self.lock().get(&signature.to_string()).cloned())
    }

    fn set_stage(
        &self,
        signature: &Signature,
        stage: JournalStage,
        failure_reason: Option<String>,
    ) -> Result<(), JournalError> {
        update_stage(&mut self.lock(), signature, stage, failure_reason)
    }

    fn open_entries(&self) -> Result<Vec<JournalEntry>, JournalError> {
        Ok(open_sorted(&self.lock()))
    }
}

/// Journal persisted as a single JSON object keyed by signature.
///
/// Every write goes to a temporary file that is then renamed over the journal,
/// so a crash never leaves a half-written file behind.
pub struct FileJournal {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileJournal {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, JournalError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let journal = Self {
            path,
            write_lock: Mutex::new(()),
        };
        // Fail early on an unreadable journal.
        journal.load()?;
        Ok(journal)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Entries, JournalError> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => Ok(Entries::new()),
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Entries::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn store(&self, entries: &Entries) -> Result<(), JournalError> {
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(entries)?)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), entries = entries.len(), "journal written");
        Ok(())
    }

    fn modify(&self, f: impl FnOnce(&mut Entries) -> Result<(), JournalError>) -> Result<(), JournalError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut entries = self.load()?;
        f(&mut entries)?;
        self.store(&entries)
    }
}

impl Journal for FileJournal {
    fn record(&self, entry: JournalEntry) -> Result<(), JournalError> {
        self.modify(|entries| {
            entries.insert(entry.signature.to_string(), entry);
            Ok(())
        })
    }

    fn get(&self, signature: &Signature) -> Result<Option<JournalEntry>, JournalError> {
        Ok(self.load()?.remove(&signature.to_string()))
    }

    fn set_stage(
        &self,
        signature: &Signature,
        stage: JournalStage,
        failure_reason: Option<String>,
    ) -> Result<(), JournalError> {
        self.modify(|entries| update_stage(entries, signature, stage, failure_reason))
    }

    fn open_entries(&self) -> Result<Vec<JournalEntry>, JournalError> {
        Ok(open_sorted(&self.load()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bos_types::{Decimal, RecordId};

    fn entry(b: u8, submitted_at: u64) -> JournalEntry {
        let request = ContributionRequest::new(
            RecordId::new("scam-1").unwrap(),
            ChainAddress::new([2u8; 32]),
            Decimal::new(25, 1),
            Some("note".into()),
        )
        .unwrap();
        JournalEntry {
            submitted_at: Timestamp::new(submitted_at),
            ..JournalEntry::submitted(
                Signature::new([b; 64]),
                request,
                ChainAddress::new([1u8; 32]),
                Lamports::new(2_500_000_000),
            )
        }
    }

    fn exercise(journal: &dyn Journal) {
        journal.record(entry(2, 20)).unwrap();
        journal.record(entry(1, 10)).unwrap();
        journal.record(entry(3, 30)).unwrap();

        journal
            .set_stage(&Signature::new([3u8; 64]), JournalStage::Reconciled, None)
            .unwrap();
        journal
            .set_stage(&Signature::new([2u8; 64]), JournalStage::TotalApplied, None)
            .unwrap();

        let open: Vec<u8> = journal
            .open_entries()
            .unwrap()
            .iter()
            .map(|e| e.signature.as_bytes()[0])
            .collect();
        assert_eq!(open, vec![1, 2]);

        let got = journal.get(&Signature::new([1u8; 64])).unwrap().unwrap();
        assert_eq!(got, entry(1, 10));
        assert!(journal.get(&Signature::new([9u8; 64])).unwrap().is_none());
        assert!(matches!(
            journal.set_stage(&Signature::new([9u8; 64]), JournalStage::Failed, None),
            Err(JournalError::NotFound(_))
        ));
    }

    #[test]
    fn memory_journal() {
        exercise(&MemoryJournal::new());
    }

    #[test]
    fn file_journal() {
        let dir = tempfile::tempdir().unwrap();
        exercise(&FileJournal::open(dir.path().join("nested/journal.json")).unwrap());
    }

    #[test]
    fn file_journal_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.json");
        {
            let journal = FileJournal::open(&path).unwrap();
            journal.record(entry(1, 10)).unwrap();
            journal
                .set_stage(&Signature::new([1u8; 64]), JournalStage::Failed, Some("expired".into()))
                .unwrap();
        }
        let reopened = FileJournal::open(&path).unwrap();
        let got = reopened.get(&Signature::new([1u8; 64])).unwrap().unwrap();
        assert_eq!(got.stage, JournalStage::Failed);
        assert_eq!(got.failure_reason.as_deref(), Some("expired"));
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn corrupted_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(FileJournal::open(&path), Err(JournalError::Json(_))));
    }
}
