//! User-requested vault mutations.
//!
//! An [`Operation`] is immutable once constructed and carries a fresh
//! [`OperationId`]; the orchestrator accepts each id at most once, so a
//! cloned operation can never be submitted twice.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Address, AssetId, OperationId};

/// Discriminant of an [`OperationBody`]; also part of the encoding context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum OperationKind {
    Deposit,
    Withdraw,
    Transfer,
    SetPrivacy,
    CreatePosition,
}

impl OperationKind {
    /// Stable byte tag used when binding a proof to its context.
    #[must_use]
    pub fn tag(self) -> u8 {
        match self {
            Self::Deposit => 1,
            Self::Withdraw => 2,
            Self::Transfer => 3,
            Self::SetPrivacy => 4,
            Self::CreatePosition => 5,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deposit => write!(f, "DEPOSIT"),
            Self::Withdraw => write!(f, "WITHDRAW"),
            Self::Transfer => write!(f, "TRANSFER"),
            Self::SetPrivacy => write!(f, "SET_PRIVACY"),
            Self::CreatePosition => write!(f, "CREATE_POSITION"),
        }
    }
}

/// The fields each kind of operation needs. Amounts stay as the user typed
/// them; the codec decides whether they are valid for the asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationBody {
    Deposit {
        asset_id: AssetId,
        amount: String,
    },
    Withdraw {
        asset_id: AssetId,
        amount: String,
    },
    Transfer {
        to: Address,
        asset_id: AssetId,
        amount: String,
    },
    SetPrivacy {
        is_private: bool,
    },
    CreatePosition {
        asset_id: AssetId,
        amount: String,
    },
}

/// One logical operation instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    id: OperationId,
    body: OperationBody,
    created_at: DateTime<Utc>,
}

impl Operation {
    fn from_body(body: OperationBody) -> Self {
        Self {
            id: OperationId::new(),
            body,
            created_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn deposit(asset_id: AssetId, amount: impl Into<String>) -> Self {
        Self::from_body(OperationBody::Deposit {
            asset_id,
            amount: amount.into(),
        })
    }

    #[must_use]
    pub fn withdraw(asset_id: AssetId, amount: impl Into<String>) -> Self {
        Self::from_body(OperationBody::Withdraw {
            asset_id,
            amount: amount.into(),
        })
    }

    #[must_use]
    pub fn transfer(to: Address, asset_id: AssetId, amount: impl Into<String>) -> Self {
        Self::from_body(OperationBody::Transfer {
            to,
            asset_id,
            amount: amount.into(),
        })
    }

    #[must_use]
    pub fn set_privacy(is_private: bool) -> Self {
        Self::from_body(OperationBody::SetPrivacy { is_private })
    }

    #[must_use]
    pub fn create_position(asset_id: AssetId, amount: impl Into<String>) -> Self {
        Self::from_body(OperationBody::CreatePosition {
            asset_id,
            amount: amount.into(),
        })
    }

    #[must_use]
    pub fn id(&self) -> OperationId {
        self.id
    }

    #[must_use]
    pub fn body(&self) -> &OperationBody {
        &self.body
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn kind(&self) -> OperationKind {
        match self.body {
            OperationBody::Deposit { .. } => OperationKind::Deposit,
            OperationBody::Withdraw { .. } => OperationKind::Withdraw,
            OperationBody::Transfer { .. } => OperationKind::Transfer,
            OperationBody::SetPrivacy { .. } => OperationKind::SetPrivacy,
            OperationBody::CreatePosition { .. } => OperationKind::CreatePosition,
        }
    }

    /// The asset this operation touches, if any.
    #[must_use]
    pub fn asset_id(&self) -> Option<AssetId> {
        match &self.body {
            OperationBody::Deposit { asset_id, .. }
            | OperationBody::Withdraw { asset_id, .. }
            | OperationBody::Transfer { asset_id, .. }
            | OperationBody::CreatePosition { asset_id, .. } => Some(*asset_id),
            OperationBody::SetPrivacy { .. } => None,
        }
    }

    /// The plaintext amount, for operations that carry one.
    #[must_use]
    pub fn amount(&self) -> Option<&str> {
        match &self.body {
            OperationBody::Deposit { amount, .. }
            | OperationBody::Withdraw { amount, .. }
            | OperationBody::Transfer { amount, .. }
            | OperationBody::CreatePosition { amount, .. } => Some(amount),
            OperationBody::SetPrivacy { .. } => None,
        }
    }

    #[must_use]
    pub fn recipient(&self) -> Option<Address> {
        match &self.body {
            OperationBody::Transfer { to, .. } => Some(*to),
            _ => None,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.body {
            OperationBody::Deposit { asset_id, amount }
            | OperationBody::Withdraw { asset_id, amount }
            | OperationBody::CreatePosition { asset_id, amount } => {
                write!(f, "{} {amount} of {asset_id}", self.kind())
            }
            OperationBody::Transfer {
                to,
                asset_id,
                amount,
            } => write!(f, "TRANSFER {amount} of {asset_id} to {}", to.short()),
            OperationBody::SetPrivacy { is_private } => {
                let mode = if *is_private { "private" } else { "public" };
                write!(f, "SET_PRIVACY {mode}")
            }
        }
    }
}
