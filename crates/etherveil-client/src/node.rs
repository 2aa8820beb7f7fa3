//! Read boundary to the chain.
//!
//! One method per vault view function plus the receipt-watch primitive.
//! Implementations wrap whatever RPC transport the application uses.

use async_trait::async_trait;
use etherveil_types::{Address, AssetId, AssetInfo, PortfolioInfo, PositionInfo, Receipt, Result, TxHash};

/// View calls and receipt watching against the vault contract.
///
/// Read failures should be reported as [`etherveil_types::VaultError::NodeRead`].
#[async_trait]
pub trait VaultNode: Send + Sync {
    /// `getPortfolioInfo(address)`.
    async fn get_portfolio_info(&self, owner: Address) -> Result<PortfolioInfo>;

    /// `getUserBalance(address)`.
    async fn get_user_balance(&self, owner: Address) -> Result<u64>;

    /// `getUserAssetBalance(address, assetId)`.
    async fn get_user_asset_balance(&self, owner: Address, asset_id: AssetId) -> Result<u64>;

    /// `getAssetInfo(assetId)`.
    async fn get_asset_info(&self, asset_id: AssetId) -> Result<AssetInfo>;

    /// `getPositionInfo(positionId)`.
    async fn get_position_info(&self, position_id: u64) -> Result<PositionInfo>;

    /// Suspend until `tx` is included and return its receipt.
    ///
    /// May wait forever; callers bound it with their own timeout.
    async fn wait_for_receipt(&self, tx: TxHash) -> Result<Receipt>;
}
