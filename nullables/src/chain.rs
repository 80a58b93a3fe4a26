//! Nullable chain endpoint.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use bos_rpc::{ChainClient, RpcError, SignatureStatus};
use bos_types::{Blockhash, ChainAddress, FreshnessToken, Lamports, Signature};

pub struct NullChain {
    balances: Mutex<HashMap<ChainAddress, Lamports>>,
    freshness: Mutex<FreshnessToken>,
    statuses: Mutex<HashMap<Signature, Option<SignatureStatus>>>,
    status_errors: Mutex<VecDeque<RpcError>>,
    status_polls: Mutex<HashMap<Signature, u32>>,
    blockhash_error: Mutex<Option<RpcError>>,
    balance_error: Mutex<Option<RpcError>>,
    send_error: Mutex<Option<RpcError>>,
    sent: Mutex<Vec<Vec<u8>>>,
}

impl NullChain {
    pub fn new() -> Self {
        Self {
            balances: Mutex::new(HashMap::new()),
            freshness: Mutex::new(FreshnessToken {
                blockhash: Blockhash::new([0xAB; 32]),
                last_valid_block_height: 1_000,
            }),
            statuses: Mutex::new(HashMap::new()),
            status_errors: Mutex::new(VecDeque::new()),
            status_polls: Mutex::new(HashMap::new()),
            blockhash_error: Mutex::new(None),
            balance_error: Mutex::new(None),
            send_error: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn set_balance(&self, address: ChainAddress, lamports: Lamports) {
        self.balances.lock().unwrap().insert(address, lamports);
    }

    pub fn set_freshness(&self, freshness: FreshnessToken) {
        *self.freshness.lock().unwrap() = freshness;
    }

    /// What `get_signature_status` reports for `signature` from now on.
    pub fn set_status(&self, signature: Signature, status: Option<SignatureStatus>) {
        self.statuses.lock().unwrap().insert(signature, status);
    }

    /// The next status reads fail with these errors, in order.
    pub fn fail_status_reads(&self, errors: impl IntoIterator<Item = RpcError>) {
        self.status_errors.lock().unwrap().extend(errors);
    }

    pub fn fail_blockhash(&self, error: Option<RpcError>) {
        *self.blockhash_error.lock().unwrap() = error;
    }

    pub fn fail_balance(&self, error: Option<RpcError>) {
        *self.balance_error.lock().unwrap() = error;
    }

    pub fn fail_send(&self, error: Option<RpcError>) {
        *self.send_error.lock().unwrap() = error;
    }

    /// How many times the status of `signature` was requested.
    pub fn status_polls(&self, signature: &Signature) -> u32 {
        self.status_polls
            .lock()
            .unwrap()
            .get(signature)
            .copied()
            .unwrap_or(0)
    }

    /// Wire transactions received by `send_transaction`.
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.sent.lock().unwrap().clone()
    }
}

impl Default for NullChain {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChainClient for NullChain {
    async fn get_balance(&self, address: &ChainAddress) -> Result<Lamports, RpcError> {
        if let Some(e) = self.balance_error.lock().unwrap().clone() {
            return Err(e);
        }
        Ok(self
            .balances
            .lock()
            .unwrap()
            .get(address)
            .copied()
            .unwrap_or(Lamports::ZERO))
    }

    async fn get_latest_blockhash(&self) -> Result<FreshnessToken, RpcError> {
        if let Some(e) = self.blockhash_error.lock().unwrap().clone() {
            return Err(e);
        }
        Ok(*self.freshness.lock().unwrap())
    }

    async fn get_signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<SignatureStatus>, RpcError> {
        *self.status_polls.lock().unwrap().entry(*signature).or_default() += 1;
        if let Some(e) = self.status_errors.lock().unwrap().pop_front() {
            return Err(e);
        }
        Ok(self
            .statuses
            .lock()
            .unwrap()
            .get(signature)
            .cloned()
            .flatten())
    }

    /// Echoes the first signature of the wire transaction, as a node does.
    async fn send_transaction(&self, wire: &[u8]) -> Result<Signature, RpcError> {
        if let Some(e) = self.send_error.lock().unwrap().clone() {
            return Err(e);
        }
        let bytes: [u8; 64] = wire
            .get(1..65)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| RpcError::Rejected {
                code: -32602,
                message: "failed to deserialize transaction".into(),
            })?;
        self.sent.lock().unwrap().push(wire.to_vec());
        Ok(Signature::new(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bos_rpc::Commitment;

    #[tokio::test]
    async fn scripted_status_with_transient_errors() {
        let chain = NullChain::new();
        let sig = Signature::new([1u8; 64]);
        chain.set_status(sig, Some(SignatureStatus::success(10, Commitment::Confirmed)));
        chain.fail_status_reads([RpcError::Http(503)]);

        assert_eq!(chain.get_signature_status(&sig).await, Err(RpcError::Http(503)));
        assert!(chain.get_signature_status(&sig).await.unwrap().is_some());
        assert_eq!(chain.status_polls(&sig), 2);
    }

    #[tokio::test]
    async fn unknown_account_has_zero_balance() {
        let chain = NullChain::new();
        assert_eq!(
            chain.get_balance(&ChainAddress::new([1u8; 32])).await.unwrap(),
            Lamports::ZERO
        );
    }
}
