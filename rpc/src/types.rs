//! Response types shared by every `ChainClient` implementation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How settled a transaction is. Ordered from weakest to strongest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Processed,
    Confirmed,
    Finalized,
}

impl Commitment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processed => "processed",
            Self::Confirmed => "confirmed",
            Self::Finalized => "finalized",
        }
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Commitment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processed" => Ok(Self::Processed),
            "confirmed" => Ok(Self::Confirmed),
            "finalized" => Ok(Self::Finalized),
            other => Err(format!("unknown commitment level: {other}")),
        }
    }
}

/// One entry of a `getSignatureStatuses` reply.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureStatus {
    pub slot: u64,
    /// `None` once the block is rooted.
    #[serde(default)]
    pub confirmations: Option<u64>,
    /// On-chain execution error, if the transaction landed but failed.
    #[serde(default)]
    pub err: Option<serde_json::Value>,
    #[serde(default)]
    pub confirmation_status: Option<Commitment>,
}

impl SignatureStatus {
    /// A status that has landed at `commitment` without error.
    pub fn success(slot: u64, commitment: Commitment) -> Self {
        Self {
            slot,
            confirmations: None,
            err: None,
            confirmation_status: Some(commitment),
        }
    }

    /// A status that has landed with an execution error.
    pub fn failure(slot: u64, err: serde_json::Value) -> Self {
        Self {
            slot,
            confirmations: None,
            err: Some(err),
            confirmation_status: Some(Commitment::Confirmed),
        }
    }

    /// Whether the transaction is settled at least as strongly as `commitment`.
    ///
    /// Older nodes omit `confirmationStatus`; a `null` confirmation count then
    /// means the block is rooted.
    pub fn reached(&self, commitment: Commitment) -> bool {
        match self.confirmation_status {
            Some(level) => level >= commitment,
            None => self.confirmations.is_none(),
        }
    }

    /// Human-readable on-chain error, if any.
    pub fn failure_reason(&self) -> Option<String> {
        self.err.as_ref().map(|e| match e {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn commitment_ordering() {
        assert!(Commitment::Processed < Commitment::Confirmed);
        assert!(Commitment::Confirmed < Commitment::Finalized);
    }

    #[test]
    fn parses_node_status() {
        let status: SignatureStatus = serde_json::from_value(json!({
            "slot": 72,
            "confirmations": 10,
            "err": null,
            "confirmationStatus": "confirmed",
            "status": { "Ok": null }
        }))
        .unwrap();
        assert_eq!(status.slot, 72);
        assert!(status.reached(Commitment::Confirmed));
        assert!(!status.reached(Commitment::Finalized));
        assert_eq!(status.failure_reason(), None);
    }

    #[test]
    fn rooted_status_without_level_counts_as_finalized() {
        let status: SignatureStatus =
            serde_json::from_value(json!({ "slot": 1, "confirmations": null, "err": null }))
                .unwrap();
        assert!(status.reached(Commitment::Finalized));
    }

    #[test]
    fn failure_reason_renders_error_object() {
        let status = SignatureStatus::failure(5, json!({ "InstructionError": [0, "Custom"] }));
        assert_eq!(
            status.failure_reason().unwrap(),
            r#"{"InstructionError":[0,"Custom"]}"#
        );
    }
}
