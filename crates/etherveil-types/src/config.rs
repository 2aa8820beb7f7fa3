//! Client configuration.
//!
//! Everything the wallet session and orchestrator need at startup lives in
//! one explicit [`VaultConfig`], built once and passed into construction.

use std::{collections::HashSet, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{constants, Address, AssetId, ChainId, ConnectorKind, Result, VaultError};

/// Top-level client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Deployed vault contract.
    pub contract_address: Address,
    /// Chains the client may operate on. The first is the default.
    pub chains: Vec<ChainConfig>,
    /// Wallet providers offered to the user.
    pub connectors: Vec<ConnectorKind>,
    /// Required when `connectors` contains WalletConnect.
    #[serde(default)]
    pub walletconnect_project_id: Option<String>,
    /// Metadata shown by wallets during connection.
    #[serde(default)]
    pub app: AppMetadata,
    /// Assets the vault supports.
    pub assets: Vec<AssetConfig>,
    #[serde(default = "default_receipt_timeout_ms")]
    pub receipt_timeout_ms: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

fn default_receipt_timeout_ms() -> u64 {
    constants::DEFAULT_RECEIPT_TIMEOUT_MS
}

fn default_connect_timeout_ms() -> u64 {
    constants::DEFAULT_CONNECT_TIMEOUT_MS
}

/// One supported chain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChainConfig {
    pub id: ChainId,
    pub name: String,
    /// HTTP transport; `None` uses the wallet's own RPC.
    #[serde(default)]
    pub rpc_url: Option<String>,
}

impl ChainConfig {
    #[must_use]
    pub fn sepolia() -> Self {
        Self {
            id: ChainId(constants::SEPOLIA_CHAIN_ID),
            name: "Sepolia".to_string(),
            rpc_url: None,
        }
    }

    #[must_use]
    pub fn mainnet() -> Self {
        Self {
            id: ChainId(constants::MAINNET_CHAIN_ID),
            name: "Ethereum".to_string(),
            rpc_url: None,
        }
    }
}

/// Application metadata passed to wallets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppMetadata {
    pub name: String,
    pub description: String,
    pub url: String,
    pub icon: String,
}

impl Default for AppMetadata {
    fn default() -> Self {
        Self {
            name: constants::APP_NAME.to_string(),
            description: "Privacy-Preserving Asset Management Platform".to_string(),
            url: "https://etherveilvault.com".to_string(),
            icon: "https://etherveilvault.com/logo.png".to_string(),
        }
    }
}

/// Registry entry for one vault asset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssetConfig {
    pub id: AssetId,
    pub symbol: String,
    pub name: String,
    /// Denomination precision; amounts may not carry more fractional digits.
    pub decimals: u32,
}

impl AssetConfig {
    #[must_use]
    pub fn new(id: u64, symbol: &str, name: &str, decimals: u32) -> Self {
        Self {
            id: AssetId(id),
            symbol: symbol.to_string(),
            name: name.to_string(),
            decimals,
        }
    }
}

impl Default for VaultConfig {
    /// The stock deployment: Sepolia + Mainnet, all four connectors, the five
    /// listed assets. `contract_address` is left zero and must be supplied
    /// (JSON or [`VaultConfig::apply_env_overrides`]) before `validate` passes.
    fn default() -> Self {
        Self {
            contract_address: Address::ZERO,
            chains: vec![ChainConfig::sepolia(), ChainConfig::mainnet()],
            connectors: vec![
                ConnectorKind::Injected,
                ConnectorKind::MetaMask,
                ConnectorKind::CoinbaseWallet,
                ConnectorKind::WalletConnect,
            ],
            walletconnect_project_id: None,
            app: AppMetadata::default(),
            assets: vec![
                AssetConfig::new(1, "ETH", "Ethereum", 18),
                AssetConfig::new(2, "stETH", "Lido Staked ETH", 18),
                AssetConfig::new(3, "USDC", "USD Coin", 6),
                AssetConfig::new(4, "UNI", "Uniswap", 18),
                AssetConfig::new(5, "AAVE", "Aave Token", 18),
            ],
            receipt_timeout_ms: constants::DEFAULT_RECEIPT_TIMEOUT_MS,
            connect_timeout_ms: constants::DEFAULT_CONNECT_TIMEOUT_MS,
        }
    }
}

impl VaultConfig {
    /// Parse a JSON config document and validate it.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup(constants::ENV_CONTRACT_ADDRESS) {
            self.contract_address = addr.parse().map_err(|e: VaultError| {
                VaultError::Configuration(format!(
                    "{}: {e}",
                    constants::ENV_CONTRACT_ADDRESS
                ))
            })?;
        }
        if let Some(project) = lookup(constants::ENV_WALLETCONNECT_PROJECT_ID) {
            let project = project.trim().to_string();
            if !project.is_empty() {
                self.walletconnect_project_id = Some(project);
            }
        }
        Ok(())
    }

    /// Check internal consistency.
    pub fn validate(&self) -> Result<()> {
        if self.contract_address.is_zero() {
            return Err(VaultError::Configuration(
                "contract_address must be set".into(),
            ));
        }
        if self.chains.is_empty() {
            return Err(VaultError::Configuration(
                "at least one chain is required".into(),
            ));
        }
        if self.connectors.is_empty() {
            return Err(VaultError::Configuration(
                "at least one connector is required".into(),
            ));
        }
        if self.connectors.contains(&ConnectorKind::WalletConnect)
            && self
                .walletconnect_project_id
                .as_deref()
                .is_none_or(str::is_empty)
        {
            return Err(VaultError::Configuration(
                "walletconnect_project_id is required for WalletConnect".into(),
            ));
        }
        let mut seen = HashSet::new();
        for asset in &self.assets {
            if !seen.insert(asset.id) {
                return Err(VaultError::Configuration(format!(
                    "duplicate asset id {}",
                    asset.id
                )));
            }
            if asset.decimals > constants::MAX_ASSET_DECIMALS {
                return Err(VaultError::Configuration(format!(
                    "asset {} has {} decimals (max {})",
                    asset.symbol,
                    asset.decimals,
                    constants::MAX_ASSET_DECIMALS
                )));
            }
        }
        if self.receipt_timeout_ms == 0 || self.connect_timeout_ms == 0 {
            return Err(VaultError::Configuration(
                "timeouts must be non-zero".into(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn asset(&self, id: AssetId) -> Option<&AssetConfig> {
        self.assets.iter().find(|a| a.id == id)
    }

    #[must_use]
    pub fn supports_chain(&self, id: ChainId) -> bool {
        self.chains.iter().any(|c| c.id == id)
    }

    #[must_use]
    pub fn receipt_timeout(&self) -> Duration {
        Duration::from_millis(self.receipt_timeout_ms)
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl VaultConfig {
    /// A valid config with a fixed contract address and no WalletConnect.
    pub fn dummy() -> Self {
        Self {
            contract_address: Address([0xc0; 20]),
            connectors: vec![ConnectorKind::Injected, ConnectorKind::MetaMask],
            ..Self::default()
        }
    }
}
