//! Application-level wiring.
//!
//! [`VaultClient`] is built once at startup from a validated
//! [`VaultConfig`] and the injected boundaries (connectors, node,
//! encryptor, sink). It owns the wallet session, the portfolio cache and
//! the orchestrator, and tears the session down on [`VaultClient::shutdown`].

use std::sync::Arc;

use etherveil_types::{
    AmountEncryptor, AssetId, AssetInfo, ConnectorKind, Identity, Operation, PositionInfo, Result,
    VaultConfig,
};
use etherveil_wallet::{ConnectorSet, WalletSession};

use crate::{
    AmountCodec, CachedPortfolio, NotificationSink, PortfolioStateCache, TrackedTransaction,
    TransactionOrchestrator, VaultNode, queries,
};

/// The vault client core.
pub struct VaultClient {
    config: Arc<VaultConfig>,
    session: Arc<WalletSession>,
    node: Arc<dyn VaultNode>,
    cache: PortfolioStateCache,
    orchestrator: TransactionOrchestrator,
}

impl VaultClient {
    /// Validate `config` and assemble the client.
    ///
    /// # Errors
    /// Returns [`etherveil_types::VaultError::Configuration`] if the config is
    /// invalid or none of the configured connectors was provided.
    pub fn new(
        config: VaultConfig,
        connectors: ConnectorSet,
        node: Arc<dyn VaultNode>,
        encryptor: Arc<dyn AmountEncryptor>,
        sink: Arc<dyn NotificationSink>,
    ) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);
        let session = Arc::new(WalletSession::new(&config, connectors)?);
        let cache = PortfolioStateCache::new(
            Arc::clone(&node),
            session.subscribe(),
            config.assets.iter().map(|a| a.id).collect(),
        );
        let codec = AmountCodec::new(encryptor, &config.assets);
        let orchestrator = TransactionOrchestrator::new(
            Arc::clone(&config),
            Arc::clone(&session),
            codec,
            Arc::clone(&node),
            cache.clone(),
            sink,
        );

        tracing::info!(
            contract = %config.contract_address,
            chains = config.chains.len(),
            assets = config.assets.len(),
            "Vault client ready"
        );
        Ok(Self {
            config,
            session,
            node,
            cache,
            orchestrator,
        })
    }

    #[must_use]
    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    #[must_use]
    pub fn session(&self) -> &Arc<WalletSession> {
        &self.session
    }

    #[must_use]
    pub fn cache(&self) -> &PortfolioStateCache {
        &self.cache
    }

    #[must_use]
    pub fn orchestrator(&self) -> &TransactionOrchestrator {
        &self.orchestrator
    }

    pub async fn connect(&self, kind: ConnectorKind) -> Result<Identity> {
        self.session.connect(kind).await
    }

    pub async fn execute(&self, operation: Operation) -> Result<TrackedTransaction> {
        self.orchestrator.execute(operation).await
    }

    #[must_use]
    pub fn portfolio(&self) -> CachedPortfolio {
        self.cache.get()
    }

    pub async fn asset(&self, asset_id: AssetId) -> Result<AssetInfo> {
        queries::fetch_asset(self.node.as_ref(), asset_id).await
    }

    /// Read a position owned by the connected account.
    pub async fn position(&self, position_id: u64) -> Result<PositionInfo> {
        let owner = self.session.identity().map(|i| i.address);
        queries::fetch_position(self.node.as_ref(), position_id, owner).await
    }

    /// Disconnect the wallet. Pending receipt watchers resolve as
    /// identity-changed.
    pub async fn shutdown(&self) {
        self.session.disconnect().await;
        tracing::info!(
            pending = self.orchestrator.pending_count(),
            "Vault client shut down"
        );
    }
}
