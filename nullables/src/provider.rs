//! Nullable wallet provider.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bos_transactions::Transaction;
use bos_types::{ChainAddress, Signature};
use bos_wallet_core::{ProviderError, ProviderEvent, WalletProvider};
use tokio::sync::broadcast;

/// A wallet provider whose answers are scripted by the test.
///
/// Unless told otherwise it connects with its fixed address and answers each
/// sign-and-send call with a fresh deterministic signature.
pub struct NullWalletProvider {
    address: ChainAddress,
    connected: AtomicBool,
    reject_connect: AtomicBool,
    next_signature: AtomicU8,
    send_results: Mutex<VecDeque<Result<Signature, ProviderError>>>,
    submitted: Mutex<Vec<Transaction>>,
    events: broadcast::Sender<ProviderEvent>,
}

impl NullWalletProvider {
    pub fn new(address: ChainAddress) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            address,
            connected: AtomicBool::new(false),
            reject_connect: AtomicBool::new(false),
            next_signature: AtomicU8::new(1),
            send_results: Mutex::new(VecDeque::new()),
            submitted: Mutex::new(Vec::new()),
            events,
        }
    }

    pub fn address(&self) -> ChainAddress {
        self.address
    }

    /// Make `connect` fail with `UserRejected`.
    pub fn reject_connect(&self, reject: bool) {
        self.reject_connect.store(reject, Ordering::SeqCst);
    }

    /// Queue the answer to the next sign-and-send call.
    pub fn respond_with(&self, result: Result<Signature, ProviderError>) {
        self.send_results.lock().unwrap().push_back(result);
    }

    /// Transactions that were signed and sent successfully.
    pub fn submitted(&self) -> Vec<Transaction> {
        self.submitted.lock().unwrap().clone()
    }

    /// Push an event as if the wallet emitted it.
    pub fn emit(&self, event: ProviderEvent) {
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl WalletProvider for NullWalletProvider {
    fn name(&self) -> &str {
        "null"
    }

    async fn connect(&self) -> Result<ChainAddress, ProviderError> {
        if self.reject_connect.load(Ordering::SeqCst) {
            return Err(ProviderError::UserRejected);
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(self.address)
    }

    async fn disconnect(&self) -> Result<(), ProviderError> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn sign_message(&self, _message: &[u8]) -> Result<Signature, ProviderError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(ProviderError::NotConnected);
        }
        Ok(Signature::new([0xEE; 64]))
    }

    async fn sign_and_send_transaction(&self, tx: &Transaction) -> Result<Signature, ProviderError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(ProviderError::NotConnected);
        }
        let scripted = self.send_results.lock().unwrap().pop_front();
        let result = scripted.unwrap_or_else(|| {
            let n = self.next_signature.fetch_add(1, Ordering::SeqCst);
            Ok(Signature::new([n; 64]))
        });
        if result.is_ok() {
            self.submitted.lock().unwrap().push(tx.clone());
        }
        result
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}
