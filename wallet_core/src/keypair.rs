//! A wallet provider backed by a locally held Ed25519 key.
//!
//! Signs legacy transfer messages itself and broadcasts them through a
//! [`ChainClient`]. An approval callback stands in for the confirmation dialog
//! a browser wallet would show.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bos_crypto::sign_message;
use bos_rpc::{ChainClient, RpcError};
use bos_transactions::{encode_transaction, Transaction};
use bos_types::{ChainAddress, Decimal, KeyPair, Lamports, Signature};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::error::ProviderError;
use crate::provider::{ProviderEvent, WalletProvider};

const EVENT_CAPACITY: usize = 16;

/// What the user is asked to approve.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferPrompt {
    pub from: ChainAddress,
    pub to: ChainAddress,
    pub lamports: Lamports,
    pub amount: Decimal,
}

type Approver = dyn Fn(&TransferPrompt) -> bool + Send + Sync;

pub struct KeypairWallet {
    keypair: KeyPair,
    chain: Arc<dyn ChainClient>,
    approve: Box<Approver>,
    connected: AtomicBool,
    events: broadcast::Sender<ProviderEvent>,
}

impl KeypairWallet {
    /// A wallet that approves every transfer.
    pub fn new(keypair: KeyPair, chain: Arc<dyn ChainClient>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            keypair,
            chain,
            approve: Box::new(|_| true),
            connected: AtomicBool::new(false),
            events,
        }
    }

    pub fn with_approval(
        mut self,
        approve: impl Fn(&TransferPrompt) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.approve = Box::new(approve);
        self
    }

    pub fn address(&self) -> ChainAddress {
        self.keypair.address
    }

    fn require_connected(&self) -> Result<(), ProviderError> {
        if self.connected.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(ProviderError::NotConnected)
        }
    }

    fn emit(&self, event: ProviderEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl WalletProvider for KeypairWallet {
    fn name(&self) -> &str {
        "keypair"
    }

    async fn connect(&self) -> Result<ChainAddress, ProviderError> {
        if !self.connected.swap(true, Ordering::AcqRel) {
            self.emit(ProviderEvent::Connect(self.keypair.address));
        }
        Ok(self.keypair.address)
    }

    async fn disconnect(&self) -> Result<(), ProviderError> {
        if self.connected.swap(false, Ordering::AcqRel) {
            self.emit(ProviderEvent::Disconnect);
        }
        Ok(())
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Signature, ProviderError> {
        self.require_connected()?;
        Ok(sign_message(message, &self.keypair.private))
    }

    async fn sign_and_send_transaction(&self, tx: &Transaction) -> Result<Signature, ProviderError> {
        self.require_connected()?;
        if *tx.from() != self.keypair.address {
            return Err(ProviderError::Other(format!(
                "transaction sender {} is not this wallet",
                tx.from()
            )));
        }

        let prompt = TransferPrompt {
            from: *tx.from(),
            to: *tx.to(),
            lamports: tx.lamports(),
            amount: tx.amount(),
        };
        if !(self.approve)(&prompt) {
            return Err(ProviderError::UserRejected);
        }

        let message = tx.message_bytes();
        let signature = sign_message(&message, &self.keypair.private);
        let wire = encode_transaction(&signature, &message);

        let reported = self.chain.send_transaction(&wire).await.map_err(|e| match e {
            RpcError::Rejected { code, message } => ProviderError::NetworkRejected { code, message },
            other => ProviderError::SendUncertain {
                signature,
                reason: other.to_string(),
            },
        })?;
        if reported != signature {
            warn!(local = %signature, reported = %reported, "node reported a different signature");
        }
        debug!(signature = %reported, "transaction sent");
        Ok(reported)
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bos_crypto::{keypair_from_seed, verify_signature};
    use bos_rpc::SignatureStatus;
    use bos_types::{Blockhash, FreshnessToken};
    use std::sync::Mutex;

    /// Records the last wire transaction and echoes its first signature.
    #[derive(Default)]
    struct EchoChain {
        sent: Mutex<Option<Vec<u8>>>,
        reject: Option<RpcError>,
    }

    #[async_trait]
    impl ChainClient for EchoChain {
        async fn get_balance(&self, _address: &ChainAddress) -> Result<Lamports, RpcError> {
            Ok(Lamports::ZERO)
        }

        async fn get_latest_blockhash(&self) -> Result<FreshnessToken, RpcError> {
            Err(RpcError::Transport("unused".into()))
        }

        async fn get_signature_status(
            &self,
            _signature: &Signature,
        ) -> Result<Option<SignatureStatus>, RpcError> {
            Ok(None)
        }

        async fn send_transaction(&self, wire: &[u8]) -> Result<Signature, RpcError> {
            if let Some(e) = &self.reject {
                return Err(e.clone());
            }
            *self.sent.lock().unwrap() = Some(wire.to_vec());
            let mut sig = [0u8; 64];
            sig.copy_from_slice(&wire[1..65]);
            Ok(Signature::new(sig))
        }
    }

    fn transfer(from: ChainAddress) -> Transaction {
        Transaction::new(
            from,
            ChainAddress::new([2u8; 32]),
            Lamports::new(1_500_000_000),
            Decimal::new(15, 1),
            FreshnessToken {
                blockhash: Blockhash::new([4u8; 32]),
                last_valid_block_height: 99,
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn signs_and_sends_verifiable_transfer() {
        let chain = Arc::new(EchoChain::default());
        let wallet = KeypairWallet::new(keypair_from_seed(&[7u8; 32]), chain.clone());
        let address = wallet.connect().await.unwrap();

        let tx = transfer(address);
        let sig = wallet.sign_and_send_transaction(&tx).await.unwrap();
        assert!(verify_signature(&tx.message_bytes(), &sig, &address));

        let wire = chain.sent.lock().unwrap().clone().unwrap();
        assert_eq!(wire[0], 1);
        assert_eq!(&wire[65..], tx.message_bytes().as_slice());
    }

    #[tokio::test]
    async fn refuses_when_not_connected() {
        let wallet = KeypairWallet::new(keypair_from_seed(&[7u8; 32]), Arc::new(EchoChain::default()));
        let tx = transfer(wallet.address());
        assert_eq!(
            wallet.sign_and_send_transaction(&tx).await,
            Err(ProviderError::NotConnected)
        );
        assert_eq!(wallet.sign_message(b"hi").await, Err(ProviderError::NotConnected));
    }

    #[tokio::test]
    async fn declined_prompt_is_user_rejection() {
        let seen = Arc::new(Mutex::new(None));
        let seen_in = seen.clone();
        let wallet = KeypairWallet::new(keypair_from_seed(&[7u8; 32]), Arc::new(EchoChain::default()))
            .with_approval(move |prompt| {
                *seen_in.lock().unwrap() = Some(prompt.clone());
                false
            });
        let address = wallet.connect().await.unwrap();

        assert_eq!(
            wallet.sign_and_send_transaction(&transfer(address)).await,
            Err(ProviderError::UserRejected)
        );
        let prompt = seen.lock().unwrap().clone().unwrap();
        assert_eq!(prompt.lamports, Lamports::new(1_500_000_000));
        assert_eq!(prompt.amount, Decimal::new(15, 1));
    }

    #[tokio::test]
    async fn foreign_sender_is_refused() {
        let wallet = KeypairWallet::new(keypair_from_seed(&[7u8; 32]), Arc::new(EchoChain::default()));
        wallet.connect().await.unwrap();
        let tx = transfer(ChainAddress::new([9u8; 32]));
        assert!(matches!(
            wallet.sign_and_send_transaction(&tx).await,
            Err(ProviderError::Other(_))
        ));
    }

    #[tokio::test]
    async fn node_rejection_is_network_rejected() {
        let chain = EchoChain {
            reject: Some(RpcError::Rejected {
                code: -32002,
                message: "insufficient funds for fee".into(),
            }),
            ..Default::default()
        };
        let wallet = KeypairWallet::new(keypair_from_seed(&[7u8; 32]), Arc::new(chain));
        let address = wallet.connect().await.unwrap();
        assert_eq!(
            wallet.sign_and_send_transaction(&transfer(address)).await,
            Err(ProviderError::NetworkRejected {
                code: -32002,
                message: "insufficient funds for fee".into()
            })
        );
    }

    #[tokio::test]
    async fn unacknowledged_send_keeps_the_local_signature() {
        let chain = EchoChain {
            reject: Some(RpcError::Timeout("no reply".into())),
            ..Default::default()
        };
        let wallet = KeypairWallet::new(keypair_from_seed(&[7u8; 32]), Arc::new(chain));
        let address = wallet.connect().await.unwrap();
        let tx = transfer(address);

        match wallet.sign_and_send_transaction(&tx).await {
            Err(ProviderError::SendUncertain { signature, reason }) => {
                assert!(verify_signature(&tx.message_bytes(), &signature, &address));
                assert!(reason.contains("no reply"));
            }
            other => panic!("expected an uncertain send, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn connect_and_disconnect_emit_events_once() {
        let wallet = KeypairWallet::new(keypair_from_seed(&[7u8; 32]), Arc::new(EchoChain::default()));
        let mut events = wallet.subscribe();

        let address = wallet.connect().await.unwrap();
        wallet.connect().await.unwrap();
        wallet.disconnect().await.unwrap();
        wallet.disconnect().await.unwrap();

        assert_eq!(events.recv().await.unwrap(), ProviderEvent::Connect(address));
        assert_eq!(events.recv().await.unwrap(), ProviderEvent::Disconnect);
        assert!(events.try_recv().is_err());
    }
}
