//! Read-side views of vault state.
//!
//! [`PortfolioInfo`], [`AssetInfo`] and [`PositionInfo`] mirror the fixed-shape
//! tuples returned by the contract's view functions. [`PortfolioSnapshot`] is
//! the immutable point-in-time read held by the portfolio cache.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{constants, Address, AssetId, SessionId};

/// `getPortfolioInfo(address)` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioInfo {
    /// Total value in cents.
    pub total_value: u64,
    pub total_assets: u64,
    pub transaction_count: u64,
    pub is_private: bool,
    pub owner: Address,
}

/// `getAssetInfo(id)` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetInfo {
    pub total_supply: u64,
    pub current_price: u64,
    pub is_supported: bool,
    pub symbol: String,
    pub name: String,
    pub token_address: Address,
}

/// `getPositionInfo(id)` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionInfo {
    pub asset_amount: u64,
    pub asset_value: u64,
    pub timestamp: u64,
    pub is_active: bool,
    pub owner: Address,
    pub asset_symbol: String,
}

/// Immutable portfolio read. Replaced wholesale on refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    /// Total value in cents.
    pub total_value: u64,
    pub asset_count: u64,
    pub transaction_count: u64,
    pub is_private: bool,
    pub owner: Address,
    /// `getUserBalance(owner)`.
    pub user_balance: u64,
    /// Per-asset balances for every configured asset.
    pub balances: BTreeMap<AssetId, u64>,
    /// Wallet session the read was made under.
    pub session: SessionId,
    pub fetched_at: DateTime<Utc>,
}

impl PortfolioSnapshot {
    /// Assemble a snapshot from the individual view reads.
    #[must_use]
    pub fn from_reads(
        info: PortfolioInfo,
        user_balance: u64,
        balances: BTreeMap<AssetId, u64>,
        session: SessionId,
    ) -> Self {
        Self {
            total_value: info.total_value,
            asset_count: info.total_assets,
            transaction_count: info.transaction_count,
            is_private: info.is_private,
            owner: info.owner,
            user_balance,
            balances,
            session,
            fetched_at: Utc::now(),
        }
    }

    /// Balance of one asset; zero when the asset was not read.
    #[must_use]
    pub fn balance_of(&self, asset_id: AssetId) -> u64 {
        self.balances.get(&asset_id).copied().unwrap_or_default()
    }

    /// Dollar rendering of `total_value`, masked when the portfolio is private.
    #[must_use]
    pub fn display_value(&self) -> String {
        if self.is_private {
            return constants::PRIVACY_MASK.to_string();
        }
        format!("${}.{:02}", self.total_value / 100, self.total_value % 100)
    }
}
