use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of waiting on a submitted transaction.
///
/// `TimedOut` only means the wait ended. The transfer may still land.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Confirmed,
    Failed(String),
    TimedOut,
}

impl Outcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed)
    }

    /// Confirmed and Failed never change once observed.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::TimedOut)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Confirmed => f.write_str("confirmed"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
            Self::TimedOut => f.write_str("timed out"),
        }
    }
}
