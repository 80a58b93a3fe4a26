//! Hands a built transaction to the wallet for signing and broadcast.

use std::sync::Arc;

use bos_transactions::{Transaction, TransitionError, TxStatus};
use bos_types::Signature;
use tracing::{info, warn};

use crate::error::SubmissionError;
use crate::provider::WalletProvider;

pub struct SubmissionGateway {
    provider: Option<Arc<dyn WalletProvider>>,
}

impl SubmissionGateway {
    pub fn new(provider: Option<Arc<dyn WalletProvider>>) -> Self {
        Self { provider }
    }

    /// Sign and send `tx`, moving it to `Submitted` on success.
    ///
    /// A returned signature means the node accepted the transaction, not that it
    /// is confirmed. On [`SubmissionError::SendUncertain`] `tx` is marked
    /// submitted under the carried signature; on any other error it is left
    /// untouched.
    pub async fn sign_and_submit(&self, tx: &mut Transaction) -> Result<Signature, SubmissionError> {
        if tx.status() != TxStatus::Built {
            return Err(SubmissionError::InvalidState(TransitionError {
                from: tx.status(),
                to: TxStatus::Submitted,
            }));
        }
        let provider = self.provider.as_ref().ok_or_else(|| {
            SubmissionError::ProviderUnavailable("wallet extension not installed".into())
        })?;

        match provider.sign_and_send_transaction(tx).await {
            Ok(signature) => {
                tx.mark_signed(signature)?;
                tx.mark_submitted(signature)?;
                info!(
                    signature = %signature,
                    from = %tx.from(),
                    to = %tx.to(),
                    lamports = tx.lamports().raw(),
                    "transfer submitted"
                );
                Ok(signature)
            }
            Err(e) => {
                let err = SubmissionError::from(e);
                match &err {
                    SubmissionError::UserRejected => info!("transfer declined in wallet"),
                    SubmissionError::SendUncertain { signature, reason } => {
                        tx.mark_signed(*signature)?;
                        tx.mark_submitted(*signature)?;
                        warn!(
                            provider = provider.name(),
                            signature = %signature,
                            reason = %reason,
                            "send not acknowledged; transfer may be in flight"
                        );
                    }
                    other => warn!(provider = provider.name(), error = %other, "submission failed"),
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::provider::ProviderEvent;
    use async_trait::async_trait;
    use bos_types::{Blockhash, ChainAddress, Decimal, FreshnessToken, Lamports};
    use tokio::sync::broadcast;

    struct OneShotProvider {
        result: Result<Signature, ProviderError>,
        events: broadcast::Sender<ProviderEvent>,
    }

    impl OneShotProvider {
        fn arc(result: Result<Signature, ProviderError>) -> Arc<dyn WalletProvider> {
            let (events, _) = broadcast::channel(1);
            Arc::new(Self { result, events })
        }
    }

    #[async_trait]
    impl WalletProvider for OneShotProvider {
        fn name(&self) -> &str {
            "one-shot"
        }

        async fn connect(&self) -> Result<ChainAddress, ProviderError> {
            Ok(ChainAddress::new([1u8; 32]))
        }

        async fn disconnect(&self) -> Result<(), ProviderError> {
            Ok(())
        }

        async fn sign_message(&self, _message: &[u8]) -> Result<Signature, ProviderError> {
            self.result.clone()
        }

        async fn sign_and_send_transaction(&self, _tx: &Transaction) -> Result<Signature, ProviderError> {
            self.result.clone()
        }

        fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
            self.events.subscribe()
        }
    }

    fn built() -> Transaction {
        Transaction::new(
            ChainAddress::new([1u8; 32]),
            ChainAddress::new([2u8; 32]),
            Lamports::new(5),
            Decimal::new(5, 9),
            FreshnessToken {
                blockhash: Blockhash::new([3u8; 32]),
                last_valid_block_height: 10,
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn success_marks_submitted() {
        let sig = Signature::new([9u8; 64]);
        let gateway = SubmissionGateway::new(Some(OneShotProvider::arc(Ok(sig))));
        let mut tx = built();
        assert_eq!(gateway.sign_and_submit(&mut tx).await.unwrap(), sig);
        assert_eq!(tx.status(), TxStatus::Submitted);
        assert_eq!(tx.signature(), Some(&sig));
    }

    #[tokio::test]
    async fn errors_are_classified() {
        let cases = [
            (ProviderError::UserRejected, SubmissionError::UserRejected),
            (
                ProviderError::NotConnected,
                SubmissionError::ProviderUnavailable("wallet not connected".into()),
            ),
            (
                ProviderError::NetworkRejected {
                    code: -32002,
                    message: "Blockhash not found".into(),
                },
                SubmissionError::NetworkRejected("Blockhash not found".into()),
            ),
            (
                ProviderError::Other("boom".into()),
                SubmissionError::Unknown("boom".into()),
            ),
        ];
        for (provider_err, expected) in cases {
            let gateway = SubmissionGateway::new(Some(OneShotProvider::arc(Err(provider_err))));
            let mut tx = built();
            assert_eq!(gateway.sign_and_submit(&mut tx).await, Err(expected));
            assert_eq!(tx.status(), TxStatus::Built);
        }
    }

    #[tokio::test]
    async fn uncertain_send_is_tracked_as_submitted() {
        let sig = Signature::new([9u8; 64]);
        let gateway = SubmissionGateway::new(Some(OneShotProvider::arc(Err(
            ProviderError::SendUncertain {
                signature: sig,
                reason: "request to node timed out".into(),
            },
        ))));
        let mut tx = built();
        assert_eq!(
            gateway.sign_and_submit(&mut tx).await,
            Err(SubmissionError::SendUncertain {
                signature: sig,
                reason: "request to node timed out".into(),
            })
        );
        assert_eq!(tx.status(), TxStatus::Submitted);
        assert_eq!(tx.signature(), Some(&sig));
    }

    #[tokio::test]
    async fn missing_provider_is_unavailable() {
        let gateway = SubmissionGateway::new(None);
        assert!(matches!(
            gateway.sign_and_submit(&mut built()).await,
            Err(SubmissionError::ProviderUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn already_submitted_transaction_is_refused() {
        let sig = Signature::new([9u8; 64]);
        let gateway = SubmissionGateway::new(Some(OneShotProvider::arc(Ok(sig))));
        let mut tx = built();
        gateway.sign_and_submit(&mut tx).await.unwrap();
        assert!(matches!(
            gateway.sign_and_submit(&mut tx).await,
            Err(SubmissionError::InvalidState(_))
        ));
    }
}
