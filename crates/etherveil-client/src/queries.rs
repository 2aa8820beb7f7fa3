//! One-shot typed reads that sit outside the portfolio cache.

use etherveil_types::{Address, AssetId, AssetInfo, PositionInfo, Result, VaultError};

use crate::VaultNode;

/// Read asset metadata, rejecting assets the vault does not support.
///
/// # Errors
/// - [`VaultError::AssetNotSupported`] if the contract reports the asset
///   as unsupported
/// - any node read error
pub async fn fetch_asset(node: &dyn VaultNode, asset_id: AssetId) -> Result<AssetInfo> {
    let info = node.get_asset_info(asset_id).await?;
    if !info.is_supported {
        tracing::debug!(asset = %asset_id, "Asset not supported by vault");
        return Err(VaultError::AssetNotSupported(asset_id.0));
    }
    Ok(info)
}

/// Read a position, optionally checking it belongs to `owner`.
///
/// # Errors
/// - [`VaultError::InvalidOperation`] if `owner` is given and differs
/// - any node read error
pub async fn fetch_position(
    node: &dyn VaultNode,
    position_id: u64,
    owner: Option<Address>,
) -> Result<PositionInfo> {
    let info = node.get_position_info(position_id).await?;
    if let Some(expected) = owner {
        if info.owner != expected {
            return Err(VaultError::InvalidOperation {
                reason: format!(
                    "position {position_id} belongs to {}, not {}",
                    info.owner.short(),
                    expected.short()
                ),
            });
        }
    }
    Ok(info)
}
