//! HTTP JSON-RPC 2.0 client for a chain node.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bos_types::{Blockhash, ChainAddress, FreshnessToken, Lamports, Signature};
use serde_json::{json, Value};

use crate::error::RpcError;
use crate::types::{Commitment, SignatureStatus};
use crate::ChainClient;

/// Default timeout for a single RPC request.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default connection timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for a node's JSON-RPC endpoint.
///
/// Wraps `reqwest::Client` with the endpoint URL and the commitment level used
/// for reads and pre-flight simulation.
pub struct RpcClient {
    http: reqwest::Client,
    url: String,
    commitment: Commitment,
    next_id: AtomicU64,
}

impl RpcClient {
    /// Create a client for `url` (e.g. `https://api.devnet.solana.com`).
    pub fn new(url: impl Into<String>, commitment: Commitment) -> Result<Self, RpcError> {
        Self::with_timeout(url, commitment, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        url: impl Into<String>,
        commitment: Commitment,
        timeout: Duration,
    ) -> Result<Self, RpcError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .map_err(|e| RpcError::Transport(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            url: url.into(),
            commitment,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn commitment(&self) -> Commitment {
        self.commitment
    }

    /// Send one JSON-RPC request and return its `result`.
    async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        tracing::debug!(method, id, "rpc request");

        let response = self.http.post(&self.url).json(&body).send().await.map_err(|e| {
            if e.is_timeout() {
                RpcError::Timeout(e.to_string())
            } else {
                RpcError::Transport(e.to_string())
            }
        })?;

        if !response.status().is_success() {
            return Err(RpcError::Http(response.status().as_u16()));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| RpcError::InvalidResponse(format!("invalid JSON: {e}")))?;

        parse_response(json)
    }
}

#[async_trait]
impl ChainClient for RpcClient {
    async fn get_balance(&self, address: &ChainAddress) -> Result<Lamports, RpcError> {
        let result = self
            .call(
                "getBalance",
                json!([address.to_string(), { "commitment": self.commitment.as_str() }]),
            )
            .await?;
        parse_balance(&result)
    }

    async fn get_latest_blockhash(&self) -> Result<FreshnessToken, RpcError> {
        let result = self
            .call(
                "getLatestBlockhash",
                json!([{ "commitment": self.commitment.as_str() }]),
            )
            .await?;
        parse_latest_blockhash(&result)
    }

    async fn get_signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<SignatureStatus>, RpcError> {
        let result = self
            .call(
                "getSignatureStatuses",
                json!([[signature.to_string()], { "searchTransactionHistory": true }]),
            )
            .await?;
        parse_signature_status(&result)
    }

    async fn send_transaction(&self, wire: &[u8]) -> Result<Signature, RpcError> {
        let encoded = BASE64.encode(wire);
        let result = self
            .call(
                "sendTransaction",
                json!([encoded, {
                    "encoding": "base64",
                    "preflightCommitment": self.commitment.as_str(),
                }]),
            )
            .await?;
        parse_send_result(&result)
    }
}

/// Split a JSON-RPC envelope into its result or its error object.
pub(crate) fn parse_response(json: Value) -> Result<Value, RpcError> {
    if let Some(err) = json.get("error").filter(|e| !e.is_null()) {
        let code = err.get("code").and_then(Value::as_i64).unwrap_or(0);
        let message = err
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string();
        return Err(RpcError::Rejected { code, message });
    }
    json.get("result")
        .cloned()
        .ok_or_else(|| RpcError::InvalidResponse("missing result".into()))
}

pub(crate) fn parse_balance(result: &Value) -> Result<Lamports, RpcError> {
    result
        .get("value")
        .and_then(Value::as_u64)
        .map(Lamports::new)
        .ok_or_else(|| RpcError::InvalidResponse("balance value missing".into()))
}

pub(crate) fn parse_latest_blockhash(result: &Value) -> Result<FreshnessToken, RpcError> {
    let value = result
        .get("value")
        .ok_or_else(|| RpcError::InvalidResponse("blockhash value missing".into()))?;
    let hash = value
        .get("blockhash")
        .and_then(Value::as_str)
        .ok_or_else(|| RpcError::InvalidResponse("blockhash missing".into()))?;
    let last_valid_block_height = value
        .get("lastValidBlockHeight")
        .and_then(Value::as_u64)
        .ok_or_else(|| RpcError::InvalidResponse("lastValidBlockHeight missing".into()))?;
    let blockhash = Blockhash::parse(hash)
        .map_err(|e| RpcError::InvalidResponse(format!("bad blockhash: {e}")))?;
    Ok(FreshnessToken {
        blockhash,
        last_valid_block_height,
    })
}

pub(crate) fn parse_signature_status(
    result: &Value,
) -> Result<Option<SignatureStatus>, RpcError> {
    let entry = result
        .get("value")
        .and_then(Value::as_array)
        .and_then(|v| v.first())
        .ok_or_else(|| RpcError::InvalidResponse("status list missing".into()))?;
    if entry.is_null() {
        return Ok(None);
    }
    serde_json::from_value(entry.clone())
        .map(Some)
        .map_err(|e| RpcError::InvalidResponse(format!("bad signature status: {e}")))
}

pub(crate) fn parse_send_result(result: &Value) -> Result<Signature, RpcError> {
    let raw = result
        .as_str()
        .ok_or_else(|| RpcError::InvalidResponse("signature missing".into()))?;
    Signature::parse(raw).map_err(|e| RpcError::InvalidResponse(format!("bad signature: {e}")))
}
