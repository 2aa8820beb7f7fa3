//! Wallet session state machine.
//!
//! The session is the sole owner of the signing [`Identity`]. It publishes
//! its [`SessionState`] on a `watch` channel; every other component holds a
//! read-only receiver and observes identity loss the moment it happens.
//!
//! ```text
//! Disconnected ──connect──▶ Connecting ──approved──▶ Connected
//!      ▲                        │                        │
//!      └──── rejected/timeout ──┘                        │
//!      └──── disconnect / account / chain / provider ────┘
//! ```

use std::time::Duration;

use chrono::Utc;
use etherveil_types::{
    Address, ChainId, ConnectorKind, ContractCall, Identity, Result, SessionId, SessionState,
    TxHash, VaultConfig, VaultError,
};
use tokio::sync::{mpsc, watch};

use crate::connector::ConnectorSet;

/// Asynchronous input from the active provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    /// The provider now reports a different active account.
    AccountsChanged(Address),
    ChainChanged(ChainId),
    /// The provider dropped the connection on its own.
    Disconnected,
}

/// A call the signer accepted, with the identity it was signed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSubmission {
    pub tx_hash: TxHash,
    pub identity: Identity,
}

/// Connection to a wallet signer.
pub struct WalletSession {
    connectors: ConnectorSet,
    chains: Vec<ChainId>,
    connect_timeout: Duration,
    state: watch::Sender<SessionState>,
}

impl WalletSession {
    /// Build a session from the configured connector set.
    ///
    /// Connectors not listed in `config.connectors` are dropped.
    pub fn new(config: &VaultConfig, mut connectors: ConnectorSet) -> Result<Self> {
        connectors.retain(&config.connectors);
        if connectors.is_empty() {
            return Err(VaultError::Configuration(
                "no configured connector was provided".into(),
            ));
        }
        let (state, _) = watch::channel(SessionState::Disconnected);
        Ok(Self {
            connectors,
            chains: config.chains.iter().map(|c| c.id).collect(),
            connect_timeout: config.connect_timeout(),
            state,
        })
    }

    /// Observe state transitions.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.state.borrow().identity().cloned()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state.borrow().is_connected()
    }

    #[must_use]
    pub fn connectors(&self) -> &ConnectorSet {
        &self.connectors
    }

    /// Connect through the chosen provider.
    ///
    /// Already connected through the same provider returns the current
    /// identity. Connected through another provider drops the old identity
    /// and disconnects that provider first. Dropping the returned future
    /// before it finishes leaves the session Disconnected.
    pub async fn connect(&self, choice: ConnectorKind) -> Result<Identity> {
        let connector = self
            .connectors
            .get(choice)
            .filter(|c| c.is_available())
            .cloned()
            .ok_or(VaultError::NoProviderAvailable(choice))?;

        let attempt = SessionId::new();
        let mut previous = None;
        let mut rejection = None;
        let mut replaced = None;
        self.state.send_modify(|state| match state {
            SessionState::Connecting { .. } => rejection = Some(VaultError::ConnectionInProgress),
            SessionState::Connected(identity) if identity.connector == choice => {
                previous = Some(identity.clone());
            }
            _ => {
                if let SessionState::Connected(old) = &*state {
                    replaced = Some(old.connector);
                }
                *state = SessionState::Connecting {
                    connector: choice,
                    attempt,
                };
            }
        });
        if let Some(err) = rejection {
            return Err(err);
        }
        if let Some(identity) = previous {
            return Ok(identity);
        }
        let _attempt = AttemptGuard {
            session: self,
            attempt,
        };

        if let Some(old) = replaced.and_then(|kind| self.connectors.get(kind)) {
            tracing::info!(from = %old.kind(), to = %choice, "Switching wallet provider");
            if let Err(err) = old.disconnect().await {
                tracing::warn!(error = %err, "Connector disconnect failed");
            }
        }

        tracing::debug!(connector = %choice, "Connecting wallet");

        let outcome = match tokio::time::timeout(self.connect_timeout, connector.connect()).await {
            Ok(Ok(account)) if !self.chains.contains(&account.chain_id) => {
                Err(VaultError::ConnectionRejected {
                    reason: format!("unsupported {}", account.chain_id),
                })
            }
            Ok(result) => result,
            Err(_) => Err(VaultError::ConnectionRejected {
                reason: "timed out".into(),
            }),
        };

        match outcome {
            Ok(account) => {
                let identity = Identity {
                    address: account.address,
                    chain_id: account.chain_id,
                    connector: choice,
                    session: attempt,
                    connected_at: Utc::now(),
                };
                let won = self.state.send_if_modified(|state| match state {
                    SessionState::Connecting { attempt: a, .. } if *a == attempt => {
                        *state = SessionState::Connected(identity.clone());
                        true
                    }
                    _ => false,
                });
                if won {
                    tracing::info!(
                        connector = %choice,
                        account = %identity.address,
                        chain = identity.chain_id.0,
                        "Wallet connected"
                    );
                    Ok(identity)
                } else {
                    tracing::warn!(connector = %choice, "Connection attempt superseded");
                    if let Err(err) = connector.disconnect().await {
                        tracing::debug!(error = %err, "Cleanup after superseded connect failed");
                    }
                    Err(VaultError::ConnectionRejected {
                        reason: "connection attempt superseded".into(),
                    })
                }
            }
            Err(err) => {
                self.abandon_attempt(attempt);
                tracing::warn!(connector = %choice, error = %err, "Wallet connection failed");
                Err(err)
            }
        }
    }

    /// Drop the connection. Identity is cleared before this first suspends.
    pub async fn disconnect(&self) {
        let previous = self.state.send_replace(SessionState::Disconnected);
        let SessionState::Connected(identity) = previous else {
            return;
        };
        tracing::info!(account = %identity.address, "Wallet disconnected");
        if let Some(connector) = self.connectors.get(identity.connector) {
            if let Err(err) = connector.disconnect().await {
                tracing::warn!(error = %err, "Connector disconnect failed");
            }
        }
    }

    /// Sign and broadcast `call` with the active identity.
    ///
    /// `expected` is the session `call` was built for. If it is no longer
    /// the active one the signer is never asked. A result arriving after the
    /// identity changed is abandoned. Both are reported as
    /// [`VaultError::IdentityChanged`].
    pub async fn sign_and_submit(
        &self,
        call: ContractCall,
        expected: SessionId,
    ) -> Result<PendingSubmission> {
        let identity = self.identity().ok_or(VaultError::NotConnected)?;
        if identity.session != expected {
            tracing::warn!(
                function = call.function_name(),
                "Call was built for a previous identity; not signing"
            );
            return Err(VaultError::IdentityChanged);
        }
        let connector = self
            .connectors
            .get(identity.connector)
            .cloned()
            .ok_or(VaultError::NoProviderAvailable(identity.connector))?;

        tracing::debug!(
            function = call.function_name(),
            account = %identity.address,
            "Requesting signature"
        );
        let result = connector.submit(&call, identity.address).await;

        if self.state.borrow().session() != Some(identity.session) {
            tracing::warn!(
                function = call.function_name(),
                "Identity changed while signature was pending; abandoning"
            );
            return Err(VaultError::IdentityChanged);
        }

        let tx_hash = result?;
        Ok(PendingSubmission { tx_hash, identity })
    }

    /// Apply a provider event. Any change to account or chain, or a
    /// provider-side disconnect, drops the session to Disconnected.
    pub fn handle_event(&self, event: &WalletEvent) {
        let changed = self.state.send_if_modified(|state| {
            let invalidates = match (&*state, event) {
                (SessionState::Disconnected, _) => false,
                (SessionState::Connecting { .. }, _) => true,
                (SessionState::Connected(identity), WalletEvent::AccountsChanged(address)) => {
                    identity.address != *address
                }
                (SessionState::Connected(identity), WalletEvent::ChainChanged(chain)) => {
                    identity.chain_id != *chain
                }
                (SessionState::Connected(_), WalletEvent::Disconnected) => true,
            };
            if invalidates {
                *state = SessionState::Disconnected;
            }
            invalidates
        });
        if changed {
            tracing::info!(event = ?event, "Wallet identity invalidated");
        }
    }

    /// Feed provider events into the session until the channel closes.
    pub async fn run_events(&self, mut events: mpsc::Receiver<WalletEvent>) {
        while let Some(event) = events.recv().await {
            self.handle_event(&event);
        }
        tracing::debug!("Wallet event stream closed");
    }

    fn abandon_attempt(&self, attempt: SessionId) {
        self.state.send_if_modified(|state| match state {
            SessionState::Connecting { attempt: a, .. } if *a == attempt => {
                *state = SessionState::Disconnected;
                true
            }
            _ => false,
        });
    }
}

/// Returns an unfinished connect attempt to Disconnected when dropped.
///
/// A no-op once the attempt has connected or been superseded.
struct AttemptGuard<'a> {
    session: &'a WalletSession,
    attempt: SessionId,
}

impl Drop for AttemptGuard<'_> {
    fn drop(&mut self) {
        self.session.abandon_attempt(self.attempt);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::fake::{ConnectBehavior, FakeConnector, SubmitBehavior};
    use etherveil_types::{ConnectedAccount, VaultCall};

    fn session_with(fake: &Arc<FakeConnector>) -> WalletSession {
        let connectors = ConnectorSet::new().with(fake.clone());
        WalletSession::new(&VaultConfig::dummy(), connectors).unwrap()
    }

    fn privacy_call(chain_id: ChainId) -> ContractCall {
        ContractCall {
            contract: Address([0xc0; 20]),
            chain_id,
            call: VaultCall::SetPortfolioPrivacy { is_private: true },
        }
    }

    #[tokio::test]
    async fn connect_records_identity() {
        let fake = Arc::new(FakeConnector::new(ConnectorKind::MetaMask));
        let session = session_with(&fake);
        let identity = session.connect(ConnectorKind::MetaMask).await.unwrap();
        assert_eq!(identity.address, fake.account().address);
        assert_eq!(session.identity(), Some(identity));
        assert!(session.is_connected());
    }

    #[tokio::test]
    async fn connect_same_provider_twice_keeps_identity() {
        let fake = Arc::new(FakeConnector::new(ConnectorKind::MetaMask));
        let session = session_with(&fake);
        let first = session.connect(ConnectorKind::MetaMask).await.unwrap();
        let second = session.connect(ConnectorKind::MetaMask).await.unwrap();
        assert_eq!(first.session, second.session);
        assert_eq!(fake.connect_count(), 1);
    }

    #[tokio::test]
    async fn rejected_connect_returns_to_disconnected() {
        let fake = Arc::new(FakeConnector::new(ConnectorKind::MetaMask));
        fake.set_connect_behavior(ConnectBehavior::Reject);
        let session = session_with(&fake);
        let err = session.connect(ConnectorKind::MetaMask).await.unwrap_err();
        assert!(matches!(err, VaultError::ConnectionRejected { .. }));
        assert_eq!(session.state(), SessionState::Disconnected);
    }

    #[tokio::test]
    async fn missing_provider_is_reported() {
        let fake = Arc::new(FakeConnector::new(ConnectorKind::MetaMask));
        let session = session_with(&fake);
        let err = session.connect(ConnectorKind::Injected).await.unwrap_err();
        assert_eq!(err, VaultError::NoProviderAvailable(ConnectorKind::Injected));
        assert_eq!(session.state(), SessionState::Disconnected);
    }

    #[tokio::test]
    async fn uninstalled_provider_is_reported() {
        let fake = Arc::new(FakeConnector::new(ConnectorKind::Injected).unavailable());
        let session = session_with(&fake);
        let err = session.connect(ConnectorKind::Injected).await.unwrap_err();
        assert!(matches!(err, VaultError::NoProviderAvailable(_)));
        assert_eq!(fake.connect_count(), 0);
    }

    #[tokio::test]
    async fn unsupported_chain_is_rejected() {
        let fake = Arc::new(FakeConnector::new(ConnectorKind::MetaMask));
        fake.set_account(ConnectedAccount {
            address: Address::random(),
            chain_id: ChainId(137),
        });
        let session = session_with(&fake);
        let err = session.connect(ConnectorKind::MetaMask).await.unwrap_err();
        assert!(err.to_string().contains("unsupported"));
        assert!(!session.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn connect_times_out() {
        let fake = Arc::new(FakeConnector::new(ConnectorKind::MetaMask));
        fake.set_connect_behavior(ConnectBehavior::Hang);
        let session = session_with(&fake);
        let err = session.connect(ConnectorKind::MetaMask).await.unwrap_err();
        assert_eq!(
            err,
            VaultError::ConnectionRejected {
                reason: "timed out".into()
            }
        );
        assert_eq!(session.state(), SessionState::Disconnected);
    }

    #[tokio::test]
    async fn disconnect_is_idempotent_and_clears_identity() {
        let fake = Arc::new(FakeConnector::new(ConnectorKind::MetaMask));
        let session = session_with(&fake);
        session.connect(ConnectorKind::MetaMask).await.unwrap();
        session.disconnect().await;
        session.disconnect().await;
        assert!(session.identity().is_none());
        assert_eq!(fake.disconnect_count(), 1);
    }

    #[tokio::test]
    async fn disconnect_clears_identity_before_connector_finishes() {
        let fake = Arc::new(FakeConnector::new(ConnectorKind::MetaMask));
        let session = Arc::new(session_with(&fake));
        session.connect(ConnectorKind::MetaMask).await.unwrap();
        let rx = session.subscribe();
        fake.hold_disconnect(true);

        let task = {
            let session = session.clone();
            tokio::spawn(async move { session.disconnect().await })
        };
        tokio::task::yield_now().await;

        assert_eq!(fake.disconnect_count(), 1);
        assert!(!task.is_finished());
        assert!(session.identity().is_none());
        assert_eq!(*rx.borrow(), SessionState::Disconnected);

        fake.release_disconnect();
        task.await.unwrap();
        assert_eq!(session.state(), SessionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_connect_returns_to_disconnected() {
        let fake = Arc::new(FakeConnector::new(ConnectorKind::MetaMask));
        fake.set_connect_behavior(ConnectBehavior::Hang);
        let session = session_with(&fake);

        let cut_short = tokio::time::timeout(
            Duration::from_millis(10),
            session.connect(ConnectorKind::MetaMask),
        )
        .await;
        assert!(cut_short.is_err());
        assert_eq!(session.state(), SessionState::Disconnected);

        fake.set_connect_behavior(ConnectBehavior::Approve);
        let identity = session.connect(ConnectorKind::MetaMask).await.unwrap();
        assert_eq!(session.identity(), Some(identity));
        assert_eq!(fake.connect_count(), 2);
    }

    #[tokio::test]
    async fn switching_provider_disconnects_the_old_one() {
        let injected = Arc::new(FakeConnector::new(ConnectorKind::Injected));
        let metamask = Arc::new(FakeConnector::new(ConnectorKind::MetaMask));
        let connectors = ConnectorSet::new()
            .with(injected.clone())
            .with(metamask.clone());
        let session = WalletSession::new(&VaultConfig::dummy(), connectors).unwrap();

        let first = session.connect(ConnectorKind::Injected).await.unwrap();
        let second = session.connect(ConnectorKind::MetaMask).await.unwrap();
        assert_ne!(first.session, second.session);
        assert_eq!(injected.disconnect_count(), 1);
        assert_eq!(metamask.disconnect_count(), 0);
        assert_eq!(session.identity().unwrap().connector, ConnectorKind::MetaMask);
    }

    #[tokio::test]
    async fn submit_requires_connection() {
        let fake = Arc::new(FakeConnector::new(ConnectorKind::MetaMask));
        let session = session_with(&fake);
        let err = session
            .sign_and_submit(privacy_call(ChainId(1)), SessionId::new())
            .await
            .unwrap_err();
        assert_eq!(err, VaultError::NotConnected);
        assert_eq!(fake.submission_count(), 0);
    }

    #[tokio::test]
    async fn call_built_for_replaced_session_is_not_signed() {
        let fake = Arc::new(FakeConnector::new(ConnectorKind::MetaMask));
        let session = session_with(&fake);
        let old = session.connect(ConnectorKind::MetaMask).await.unwrap();

        session.handle_event(&WalletEvent::AccountsChanged(Address::random()));
        fake.set_account(ConnectedAccount {
            address: Address::random(),
            chain_id: old.chain_id,
        });
        let current = session.connect(ConnectorKind::MetaMask).await.unwrap();

        let err = session
            .sign_and_submit(privacy_call(current.chain_id), old.session)
            .await
            .unwrap_err();
        assert_eq!(err, VaultError::IdentityChanged);
        assert_eq!(fake.submission_count(), 0);

        let pending = session
            .sign_and_submit(privacy_call(current.chain_id), current.session)
            .await
            .unwrap();
        assert_eq!(pending.identity, current);
    }

    #[tokio::test]
    async fn signer_rejection_is_not_a_state_change() {
        let fake = Arc::new(FakeConnector::new(ConnectorKind::MetaMask));
        fake.set_submit_behavior(SubmitBehavior::Reject("user denied".into()));
        let session = session_with(&fake);
        let identity = session.connect(ConnectorKind::MetaMask).await.unwrap();
        let err = session
            .sign_and_submit(privacy_call(identity.chain_id), identity.session)
            .await
            .unwrap_err();
        assert!(matches!(err, VaultError::SubmissionRejected { .. }));
        assert!(session.is_connected());
    }

    #[tokio::test]
    async fn account_change_forces_disconnect() {
        let fake = Arc::new(FakeConnector::new(ConnectorKind::MetaMask));
        let session = session_with(&fake);
        let identity = session.connect(ConnectorKind::MetaMask).await.unwrap();
        let mut rx = session.subscribe();
        let _ = rx.borrow_and_update();

        // Same account: no-op.
        session.handle_event(&WalletEvent::AccountsChanged(identity.address));
        assert!(session.is_connected());

        session.handle_event(&WalletEvent::AccountsChanged(Address::random()));
        assert!(!session.is_connected());
        assert!(rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn chain_change_and_provider_disconnect_force_disconnect() {
        let fake = Arc::new(FakeConnector::new(ConnectorKind::MetaMask));
        let session = session_with(&fake);
        session.connect(ConnectorKind::MetaMask).await.unwrap();
        session.handle_event(&WalletEvent::ChainChanged(ChainId(1)));
        assert!(!session.is_connected());

        session.connect(ConnectorKind::MetaMask).await.unwrap();
        session.handle_event(&WalletEvent::Disconnected);
        assert_eq!(session.state(), SessionState::Disconnected);
    }

    #[tokio::test]
    async fn identity_change_during_signature_abandons_submission() {
        let fake = Arc::new(FakeConnector::new(ConnectorKind::MetaMask));
        fake.set_submit_behavior(SubmitBehavior::Hold);
        let session = Arc::new(session_with(&fake));
        let identity = session.connect(ConnectorKind::MetaMask).await.unwrap();

        let task = {
            let session = session.clone();
            tokio::spawn(async move {
                session
                    .sign_and_submit(privacy_call(identity.chain_id), identity.session)
                    .await
            })
        };
        tokio::task::yield_now().await;
        session.handle_event(&WalletEvent::AccountsChanged(Address::random()));
        fake.release_submission();

        let err = task.await.unwrap().unwrap_err();
        assert_eq!(err, VaultError::IdentityChanged);
    }

    #[tokio::test]
    async fn event_during_connect_supersedes_attempt() {
        let fake = Arc::new(FakeConnector::new(ConnectorKind::MetaMask));
        fake.set_connect_behavior(ConnectBehavior::Hang);
        let session = Arc::new(session_with(&fake));

        let task = {
            let session = session.clone();
            tokio::spawn(async move { session.connect(ConnectorKind::MetaMask).await })
        };
        tokio::task::yield_now().await;
        assert!(matches!(session.state(), SessionState::Connecting { .. }));
        assert_eq!(
            session.connect(ConnectorKind::MetaMask).await.unwrap_err(),
            VaultError::ConnectionInProgress
        );

        session.handle_event(&WalletEvent::Disconnected);
        assert_eq!(session.state(), SessionState::Disconnected);
        task.abort();
    }

    #[tokio::test]
    async fn event_pump_applies_events() {
        let fake = Arc::new(FakeConnector::new(ConnectorKind::MetaMask));
        let session = session_with(&fake);
        session.connect(ConnectorKind::MetaMask).await.unwrap();

        let (tx, rx) = mpsc::channel(4);
        tx.send(WalletEvent::ChainChanged(ChainId(1))).await.unwrap();
        drop(tx);
        session.run_events(rx).await;
        assert!(!session.is_connected());
    }

    #[test]
    fn session_needs_a_configured_connector() {
        let connectors = ConnectorSet::new().with(Arc::new(FakeConnector::new(
            ConnectorKind::WalletConnect,
        )));
        let err = WalletSession::new(&VaultConfig::dummy(), connectors)
            .err()
            .unwrap();
        assert!(matches!(err, VaultError::Configuration(_)));
    }
}
