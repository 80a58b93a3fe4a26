//! Timestamp type used for contribution records and journal entries.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds since the Unix epoch (UTC). Stored in the `created_at` column and
/// in journal entries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    pub fn new(secs: u64) -> Self {
        Self(secs)
    }

    /// Current system time. A clock set before 1970 reads as the epoch.
    pub fn now() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self(secs)
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }

    /// Seconds elapsed since this timestamp (relative to `now`).
    pub fn elapsed_since(&self, now: Timestamp) -> u64 {
        now.0.saturating_sub(self.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_never_underflows() {
        let submitted = Timestamp::new(100);
        assert_eq!(submitted.elapsed_since(Timestamp::new(160)), 60);
        assert_eq!(submitted.elapsed_since(Timestamp::new(40)), 0);
    }

    #[test]
    fn now_is_after_2020() {
        assert!(Timestamp::now().as_secs() > 1_577_836_800);
    }

    #[test]
    fn serializes_as_plain_seconds() {
        assert_eq!(serde_json::to_string(&Timestamp::new(42)).unwrap(), "42");
    }
}
