//! Parsing boundary between untyped store rows and bounty entities.
//!
//! Rows arrive as JSON objects. Everything is validated here, once; code past
//! this module only sees `ScammerRecord` and `ContributionRecord`.
//!
//! `scammers` columns: `id`, `name`, `bounty_amount`, `wallet_address`.
//! `contributions` columns: `id`, `scammer_id`, `contributor_address`, `amount`,
//! `message`, `created_at` (unix seconds), `transaction_signature`.

use std::str::FromStr;

use bos_types::{ChainAddress, ContributionRecord, Decimal, RecordId, ScammerRecord, Signature, Timestamp};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::error::StoreError;

pub fn parse_scammer_row(row: &Value) -> Result<ScammerRecord, StoreError> {
    let obj = as_object(row)?;
    let id = record_id_field(obj, "id")?;
    let name = str_field(obj, "name")?.to_string();

    let bounty_total = match obj.get("bounty_amount") {
        None | Some(Value::Null) => Decimal::ZERO,
        Some(v) => decimal_value("bounty_amount", v)?,
    };
    if bounty_total.is_sign_negative() && !bounty_total.is_zero() {
        return Err(StoreError::Malformed(format!("record {id} has a negative bounty")));
    }

    let bounty_address = match obj.get("wallet_address") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(Value::String(s)) => Some(
            ChainAddress::parse(s.trim())
                .map_err(|e| StoreError::Malformed(format!("wallet_address: {e}")))?,
        ),
        Some(other) => {
            return Err(StoreError::Malformed(format!(
                "wallet_address: expected string, got {other}"
            )))
        }
    };

    Ok(ScammerRecord {
        id,
        name,
        bounty_total,
        bounty_address,
    })
}

pub fn parse_contribution_row(row: &Value) -> Result<ContributionRecord, StoreError> {
    let obj = as_object(row)?;
    let id = Uuid::parse_str(str_field(obj, "id")?)
        .map_err(|e| StoreError::Malformed(format!("id: {e}")))?;
    let target_record_id = record_id_field(obj, "scammer_id")?;
    let contributor_address = ChainAddress::parse(str_field(obj, "contributor_address")?)
        .map_err(|e| StoreError::Malformed(format!("contributor_address: {e}")))?;
    let amount = decimal_value(
        "amount",
        obj.get("amount")
            .ok_or_else(|| StoreError::Malformed("missing amount".into()))?,
    )?;
    let message = match obj.get("message") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => {
            return Err(StoreError::Malformed(format!("message: expected string, got {other}")))
        }
    };
    let timestamp = obj
        .get("created_at")
        .and_then(Value::as_u64)
        .map(Timestamp::new)
        .ok_or_else(|| StoreError::Malformed("created_at: expected unix seconds".into()))?;
    let transaction_signature = Signature::parse(str_field(obj, "transaction_signature")?)
        .map_err(|e| StoreError::Malformed(format!("transaction_signature: {e}")))?;

    Ok(ContributionRecord {
        id,
        target_record_id,
        contributor_address,
        amount,
        message,
        timestamp,
        transaction_signature,
    })
}

/// The row written for a new contribution.
pub fn contribution_row(record: &ContributionRecord) -> Value {
    json!({
        "id": record.id.to_string(),
        "scammer_id": record.target_record_id.as_str(),
        "contributor_address": record.contributor_address.to_string(),
        "amount": record.amount.to_string(),
        "message": record.message,
        "created_at": record.timestamp.as_secs(),
        "transaction_signature": record.transaction_signature.to_string(),
    })
}

/// Decimal columns may come back as JSON numbers or as strings (numeric
/// columns are often serialized as strings to keep precision).
pub fn decimal_value(field: &str, value: &Value) -> Result<Decimal, StoreError> {
    let parsed = match value {
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .ok(),
        _ => None,
    };
    parsed.ok_or_else(|| StoreError::Malformed(format!("{field}: not a decimal: {value}")))
}

fn as_object(row: &Value) -> Result<&Map<String, Value>, StoreError> {
    row.as_object()
        .ok_or_else(|| StoreError::Malformed(format!("expected object, got {row}")))
}

fn str_field<'a>(obj: &'a Map<String, Value>, field: &str) -> Result<&'a str, StoreError> {
    obj.get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| StoreError::Malformed(format!("{field}: missing or not a string")))
}

fn record_id_field(obj: &Map<String, Value>, field: &str) -> Result<RecordId, StoreError> {
    let raw = match obj.get(field) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => return Err(StoreError::Malformed(format!("{field}: missing"))),
    };
    RecordId::new(raw).map_err(|e| StoreError::Malformed(format!("{field}: {e}")))
}
