//! Wallet connector capability.
//!
//! A connector is anything that can connect an account, disconnect it, and
//! sign-and-send a contract call on its behalf. The session holds a typed
//! [`ConnectorSet`] keyed by [`ConnectorKind`].

use std::{collections::BTreeMap, fmt, sync::Arc};

use async_trait::async_trait;
use etherveil_types::{Address, ConnectedAccount, ConnectorKind, ContractCall, Result, TxHash};

/// One wallet provider.
///
/// Implementations map their provider's failures onto the shared taxonomy:
/// `ConnectionRejected` for a refused connection, `SubmissionRejected` for a
/// refused signature (user denial, insufficient funds), `SubmissionFailed`
/// for transport errors.
#[async_trait]
pub trait Connector: Send + Sync {
    fn kind(&self) -> ConnectorKind;

    /// Display name. Defaults to the kind's name.
    fn name(&self) -> String {
        self.kind().to_string()
    }

    /// Whether the provider is installed / reachable at all.
    fn is_available(&self) -> bool {
        true
    }

    /// Ask the user to connect. Suspends until they answer.
    async fn connect(&self) -> Result<ConnectedAccount>;

    async fn disconnect(&self) -> Result<()>;

    /// Sign `call` as `from` and broadcast it.
    async fn submit(&self, call: &ContractCall, from: Address) -> Result<TxHash>;
}

/// The connectors a session can choose from.
#[derive(Clone, Default)]
pub struct ConnectorSet {
    connectors: BTreeMap<ConnectorKind, Arc<dyn Connector>>,
}

impl ConnectorSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connector, replacing any previous one of the same kind.
    #[must_use]
    pub fn with(mut self, connector: Arc<dyn Connector>) -> Self {
        self.insert(connector);
        self
    }

    pub fn insert(&mut self, connector: Arc<dyn Connector>) {
        self.connectors.insert(connector.kind(), connector);
    }

    #[must_use]
    pub fn get(&self, kind: ConnectorKind) -> Option<&Arc<dyn Connector>> {
        self.connectors.get(&kind)
    }

    /// Kinds that are registered and currently available.
    #[must_use]
    pub fn available(&self) -> Vec<ConnectorKind> {
        self.connectors
            .values()
            .filter(|c| c.is_available())
            .map(|c| c.kind())
            .collect()
    }

    /// Keep only the kinds listed in `allowed`.
    pub fn retain(&mut self, allowed: &[ConnectorKind]) {
        self.connectors.retain(|kind, _| allowed.contains(kind));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.connectors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connectors.is_empty()
    }
}

impl fmt::Debug for ConnectorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.connectors.keys()).finish()
    }
}
