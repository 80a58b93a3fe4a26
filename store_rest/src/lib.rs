//! HTTP client for the hosted bounty backend.
//!
//! Talks to a PostgREST-style REST interface:
//! - `GET  /rest/v1/scammers?id=eq.{id}`
//! - `POST /rest/v1/rpc/increment_bounty` (server-side atomic increment)
//! - `POST /rest/v1/contributions`
//! - `GET  /rest/v1/contributions?transaction_signature=eq.{sig}`

use std::time::Duration;

use async_trait::async_trait;
use bos_store::raw::{contribution_row, decimal_value, parse_contribution_row, parse_scammer_row};
use bos_store::{BountyStore, StoreError};
use bos_types::{ContributionRecord, Decimal, RecordId, ScammerRecord, Signature};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde_json::{json, Value};
use tracing::debug;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

pub struct RestStore {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl RestStore {
    /// `base_url` is the project root, e.g. `https://xyz.supabase.co`.
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Result<Self, StoreError> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .map_err(|e| StoreError::Backend(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, path)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => builder.header("apikey", key).bearer_auth(key),
            None => builder,
        }
    }

    fn record_request(&self, id: &RecordId) -> RequestBuilder {
        self.authorized(
            self.http
                .get(self.endpoint("scammers"))
                .query(&[("id", format!("eq.{id}")), ("select", "*".to_string())]),
        )
    }

    fn increment_request(&self, id: &RecordId, delta: Decimal) -> RequestBuilder {
        self.authorized(
            self.http
                .post(self.endpoint("rpc/increment_bounty"))
                .json(&json!({ "record_id": id.as_str(), "delta": delta.to_string() })),
        )
    }

    fn append_request(&self, record: &ContributionRecord) -> RequestBuilder {
        self.authorized(
            self.http
                .post(self.endpoint("contributions"))
                .header("Prefer", "return=minimal")
                .json(&contribution_row(record)),
        )
    }

    fn find_request(&self, signature: &Signature) -> RequestBuilder {
        self.authorized(self.http.get(self.endpoint("contributions")).query(&[
            ("transaction_signature", format!("eq.{signature}")),
            ("limit", "1".to_string()),
        ]))
    }
}

async fn send(builder: RequestBuilder) -> Result<Response, StoreError> {
    let response = builder.send().await.map_err(|e| {
        if e.is_timeout() || e.is_connect() {
            StoreError::Unavailable(e.to_string())
        } else {
            StoreError::Backend(e.to_string())
        }
    })?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(status_error(status, body))
}

fn status_error(status: StatusCode, body: String) -> StoreError {
    let detail = format!("HTTP {status}: {body}");
    match status {
        StatusCode::NOT_FOUND => StoreError::NotFound(detail),
        StatusCode::CONFLICT => StoreError::Duplicate(detail),
        s if s.is_server_error() => StoreError::Unavailable(detail),
        _ => StoreError::Backend(detail),
    }
}

async fn json_body(response: Response) -> Result<Value, StoreError> {
    response
        .json()
        .await
        .map_err(|e| StoreError::Malformed(format!("invalid JSON: {e}")))
}

/// First row of a PostgREST array response.
fn first_row(body: &Value) -> Result<Option<&Value>, StoreError> {
    body.as_array()
        .map(|rows| rows.first())
        .ok_or_else(|| StoreError::Malformed(format!("expected array, got {body}")))
}

#[async_trait]
impl BountyStore for RestStore {
    async fn get_record(&self, id: &RecordId) -> Result<Option<ScammerRecord>, StoreError> {
        let body = json_body(send(self.record_request(id)).await?).await?;
        first_row(&body)?.map(parse_scammer_row).transpose()
    }

    async fn increment_bounty_total(&self, id: &RecordId, delta: Decimal) -> Result<Decimal, StoreError> {
        let body = json_body(send(self.increment_request(id, delta)).await?).await?;
        // The function returns the new total, or null when no row matched.
        if body.is_null() {
            return Err(StoreError::NotFound(format!("record {id}")));
        }
        let total = decimal_value("increment_bounty", &body)?;
        debug!(record = %id, delta = %delta, total = %total, "bounty incremented");
        Ok(total)
    }

    async fn append_contribution(&self, record: &ContributionRecord) -> Result<(), StoreError> {
        send(self.append_request(record)).await?;
        Ok(())
    }

    async fn find_contribution_by_signature(
        &self,
        signature: &Signature,
    ) -> Result<Option<ContributionRecord>, StoreError> {
        let body = json_body(send(self.find_request(signature)).await?).await?;
        first_row(&body)?.map(parse_contribution_row).transpose()
    }
}
