//! System-wide constants for the EtherVeil vault client.

/// Default time to wait for a receipt before declaring a transaction dropped.
pub const DEFAULT_RECEIPT_TIMEOUT_MS: u64 = 120_000;

/// Default time to wait for a wallet to answer a connection request.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 60_000;

/// Highest denomination precision accepted for an asset.
pub const MAX_ASSET_DECIMALS: u32 = 18;

/// Sepolia testnet chain id.
pub const SEPOLIA_CHAIN_ID: u64 = 11_155_111;

/// Ethereum mainnet chain id.
pub const MAINNET_CHAIN_ID: u64 = 1;

/// Mask shown in place of values when a portfolio is private.
pub const PRIVACY_MASK: &str = "••••••";

/// Domain separator mixed into every encoding context digest.
pub const ENCODING_DOMAIN: &[u8] = b"etherveil:amount:v1:";

/// Environment variable overriding the vault contract address.
pub const ENV_CONTRACT_ADDRESS: &str = "ETHERVEIL_CONTRACT_ADDRESS";

/// Environment variable overriding the WalletConnect project id.
pub const ENV_WALLETCONNECT_PROJECT_ID: &str = "ETHERVEIL_WALLETCONNECT_PROJECT_ID";

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name reported to wallets.
pub const APP_NAME: &str = "Ether Veil Vault";
