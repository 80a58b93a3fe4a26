//! Wallet connection state.
//!
//! `WalletSession` is the single source of truth for "is a wallet connected and
//! which account is it". It is updated by explicit connect/disconnect calls and
//! by provider events delivered through `listen()`.

use std::sync::{Arc, RwLock};

use bos_types::ChainAddress;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::SessionError;
use crate::provider::{ProviderEvent, WalletProvider};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionStatus {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum SessionState {
    Disconnected,
    Connecting,
    Connected(ChainAddress),
    Error(String),
}

impl SessionState {
    fn status(&self) -> SessionStatus {
        match self {
            Self::Disconnected => SessionStatus::Disconnected,
            Self::Connecting => SessionStatus::Connecting,
            Self::Connected(_) => SessionStatus::Connected,
            Self::Error(_) => SessionStatus::Error,
        }
    }
}

/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct WalletSession {
    provider: Option<Arc<dyn WalletProvider>>,
    state: Arc<RwLock<SessionState>>,
}

impl WalletSession {
    /// `provider` is `None` when no wallet is installed.
    pub fn new(provider: Option<Arc<dyn WalletProvider>>) -> Self {
        Self {
            provider,
            state: Arc::new(RwLock::new(SessionState::Disconnected)),
        }
    }

    pub fn provider(&self) -> Option<&Arc<dyn WalletProvider>> {
        self.provider.as_ref()
    }

    pub fn status(&self) -> SessionStatus {
        self.read().status()
    }

    /// The connected account. Present exactly when the status is `Connected`.
    pub fn current_address(&self) -> Option<ChainAddress> {
        match &*self.read() {
            SessionState::Connected(address) => Some(*address),
            _ => None,
        }
    }

    pub fn last_error(&self) -> Option<String> {
        match &*self.read() {
            SessionState::Error(reason) => Some(reason.clone()),
            _ => None,
        }
    }

    /// Whether the session can sign for `address`.
    pub fn has_signing_capability(&self, address: &ChainAddress) -> bool {
        self.current_address().as_ref() == Some(address)
    }

    pub async fn connect(&self) -> Result<ChainAddress, SessionError> {
        let Some(provider) = self.provider.clone() else {
            let err = SessionError::ProviderMissing;
            self.set(SessionState::Error(err.to_string()));
            return Err(err);
        };

        self.set(SessionState::Connecting);
        match provider.connect().await {
            Ok(address) => {
                info!(provider = provider.name(), address = %address, "wallet connected");
                self.set(SessionState::Connected(address));
                Ok(address)
            }
            Err(e) => {
                let err = SessionError::from(e);
                warn!(provider = provider.name(), error = %err, "wallet connection failed");
                self.set(SessionState::Error(err.to_string()));
                Err(err)
            }
        }
    }

    /// Connect unless already connected.
    pub async fn ensure_connected(&self) -> Result<ChainAddress, SessionError> {
        match self.current_address() {
            Some(address) => Ok(address),
            None => self.connect().await,
        }
    }

    /// Disconnect. Calling this while disconnected does nothing.
    pub async fn disconnect(&self) {
        if self.status() == SessionStatus::Disconnected {
            return;
        }
        if let Some(provider) = &self.provider {
            if let Err(e) = provider.disconnect().await {
                warn!(provider = provider.name(), error = %e, "provider disconnect failed");
            }
        }
        self.set(SessionState::Disconnected);
        info!("wallet disconnected");
    }

    /// Fold one provider event into the session.
    pub async fn apply_event(&self, event: ProviderEvent) {
        debug!(?event, "provider event");
        match event {
            ProviderEvent::Connect(address) | ProviderEvent::AccountChanged(Some(address)) => {
                if self.current_address() != Some(address) {
                    info!(address = %address, "wallet account changed");
                }
                self.set(SessionState::Connected(address));
            }
            ProviderEvent::AccountChanged(None) => {
                // The wallet stopped exposing an account; ask again.
                if let Err(e) = self.connect().await {
                    debug!(error = %e, "reconnect after account change failed");
                }
            }
            ProviderEvent::Disconnect => {
                self.set(SessionState::Disconnected);
                info!("wallet disconnected by provider");
            }
        }
    }

    /// Start applying provider events in the background.
    ///
    /// Events stop being applied when the returned subscription is dropped.
    /// Returns `None` when no provider is installed.
    pub fn listen(&self) -> Option<EventSubscription> {
        let provider = self.provider.as_ref()?;
        let mut events = provider.subscribe();
        let session = self.clone();
        let task = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => session.apply_event(event).await,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "provider events lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
        Some(EventSubscription { task })
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn set(&self, next: SessionState) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        *state = next;
    }
}

/// Handle to a running event listener. Dropping it stops the listener.
pub struct EventSubscription {
    task: JoinHandle<()>,
}

impl EventSubscription {
    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::ProviderError;
    use async_trait::async_trait;
    use bos_transactions::Transaction;
    use bos_types::Signature;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::broadcast;

    /// Provider whose connect results are scripted by the test.
    pub(crate) struct ScriptedProvider {
        pub connect_results: Mutex<Vec<Result<ChainAddress, ProviderError>>>,
        pub events: broadcast::Sender<ProviderEvent>,
        pub disconnects: Mutex<u32>,
    }

    impl ScriptedProvider {
        pub(crate) fn new(results: Vec<Result<ChainAddress, ProviderError>>) -> Arc<Self> {
            let (events, _) = broadcast::channel(16);
            Arc::new(Self {
                connect_results: Mutex::new(results),
                events,
                disconnects: Mutex::new(0),
            })
        }
    }

    #[async_trait]
    impl WalletProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn connect(&self) -> Result<ChainAddress, ProviderError> {
            let mut results = self.connect_results.lock().unwrap();
            if results.is_empty() {
                return Err(ProviderError::UserRejected);
            }
            results.remove(0)
        }

        async fn disconnect(&self) -> Result<(), ProviderError> {
            *self.disconnects.lock().unwrap() += 1;
            Ok(())
        }

        async fn sign_message(&self, _message: &[u8]) -> Result<Signature, ProviderError> {
            Err(ProviderError::NotConnected)
        }

        async fn sign_and_send_transaction(&self, _tx: &Transaction) -> Result<Signature, ProviderError> {
            Err(ProviderError::NotConnected)
        }

        fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
            self.events.subscribe()
        }
    }

    fn addr(b: u8) -> ChainAddress {
        ChainAddress::new([b; 32])
    }

    async fn wait_for(session: &WalletSession, want: Option<ChainAddress>) {
        for _ in 0..100 {
            if session.current_address() == want {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("session never reached {want:?}");
    }

    #[tokio::test]
    async fn connect_success() {
        let session = WalletSession::new(Some(ScriptedProvider::new(vec![Ok(addr(1))])));
        assert_eq!(session.status(), SessionStatus::Disconnected);

        assert_eq!(session.connect().await.unwrap(), addr(1));
        assert_eq!(session.status(), SessionStatus::Connected);
        assert_eq!(session.current_address(), Some(addr(1)));
        assert!(session.has_signing_capability(&addr(1)));
        assert!(!session.has_signing_capability(&addr(2)));
    }

    #[tokio::test]
    async fn connect_without_provider_is_error() {
        let session = WalletSession::new(None);
        assert_eq!(session.connect().await, Err(SessionError::ProviderMissing));
        assert_eq!(session.status(), SessionStatus::Error);
        assert_eq!(session.current_address(), None);
        assert!(session.last_error().is_some());
        assert!(session.listen().is_none());
    }

    #[tokio::test]
    async fn rejected_connect_records_reason() {
        let session = WalletSession::new(Some(ScriptedProvider::new(vec![Err(
            ProviderError::UserRejected,
        )])));
        assert_eq!(session.connect().await, Err(SessionError::UserRejected));
        assert_eq!(session.status(), SessionStatus::Error);
        assert_eq!(session.current_address(), None);
    }

    #[tokio::test]
    async fn ensure_connected_reuses_existing_connection() {
        let session = WalletSession::new(Some(ScriptedProvider::new(vec![Ok(addr(1))])));
        session.connect().await.unwrap();
        // The script is exhausted, so a second provider.connect() would fail.
        assert_eq!(session.ensure_connected().await.unwrap(), addr(1));
    }

    #[tokio::test]
    async fn disconnect_is_idempotent() {
        let provider = ScriptedProvider::new(vec![Ok(addr(1))]);
        let session = WalletSession::new(Some(provider.clone()));
        session.connect().await.unwrap();

        session.disconnect().await;
        session.disconnect().await;
        assert_eq!(session.status(), SessionStatus::Disconnected);
        assert_eq!(session.current_address(), None);
        assert_eq!(*provider.disconnects.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn account_change_switches_address() {
        let session = WalletSession::new(Some(ScriptedProvider::new(vec![Ok(addr(1))])));
        session.connect().await.unwrap();

        session.apply_event(ProviderEvent::AccountChanged(Some(addr(2)))).await;
        assert_eq!(session.current_address(), Some(addr(2)));
        assert!(!session.has_signing_capability(&addr(1)));
    }

    #[tokio::test]
    async fn account_cleared_reconnects() {
        let session = WalletSession::new(Some(ScriptedProvider::new(vec![Ok(addr(1)), Ok(addr(3))])));
        session.connect().await.unwrap();

        session.apply_event(ProviderEvent::AccountChanged(None)).await;
        assert_eq!(session.current_address(), Some(addr(3)));
    }

    #[tokio::test]
    async fn listener_applies_events_until_dropped() {
        let provider = ScriptedProvider::new(vec![Ok(addr(1))]);
        let session = WalletSession::new(Some(provider.clone()));
        session.connect().await.unwrap();

        let subscription = session.listen().unwrap();
        assert!(subscription.is_active());

        provider.events.send(ProviderEvent::AccountChanged(Some(addr(2)))).unwrap();
        wait_for(&session, Some(addr(2))).await;

        provider.events.send(ProviderEvent::Disconnect).unwrap();
        wait_for(&session, None).await;
        assert_eq!(session.status(), SessionStatus::Disconnected);

        drop(subscription);
        tokio::time::sleep(Duration::from_millis(20)).await;
        // Nobody is listening any more.
        assert!(provider.events.send(ProviderEvent::Connect(addr(4))).is_err());
        assert_eq!(session.current_address(), None);
    }
}
