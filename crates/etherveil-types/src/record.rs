//! Transaction lifecycle records and on-chain receipts.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Operation, RecordId, TxHash, VaultError};

/// Why a record ended in `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    /// The codec refused the plaintext amount. No wallet interaction.
    InvalidAmount { reason: String },
    /// The encryptor failed. No wallet interaction.
    EncryptionFailed { reason: String },
    /// No identity at submission time.
    NotConnected,
    /// The signer refused the call before inclusion.
    SubmissionRejected { reason: String },
    /// The call could not be delivered before inclusion.
    SubmissionFailed { reason: String },
    /// Included, but the contract rejected it.
    Reverted { reason: String },
    /// Never observed within the watch window.
    DroppedOrTimedOut,
    /// The account or chain changed while the transaction was in flight.
    IdentityChanged,
}

impl FailureReason {
    /// Classify a pre-inclusion error into a terminal reason.
    #[must_use]
    pub fn from_error(err: &VaultError) -> Self {
        match err {
            VaultError::InvalidAmount { input, reason } => Self::InvalidAmount {
                reason: format!("'{input}': {reason}"),
            },
            VaultError::EncryptionFailed { reason } => Self::EncryptionFailed {
                reason: reason.clone(),
            },
            VaultError::NotConnected => Self::NotConnected,
            VaultError::IdentityChanged => Self::IdentityChanged,
            VaultError::SubmissionRejected { reason } => Self::SubmissionRejected {
                reason: reason.clone(),
            },
            VaultError::Reverted { reason, .. } => Self::Reverted {
                reason: reason.clone(),
            },
            VaultError::DroppedOrTimedOut(_) => Self::DroppedOrTimedOut,
            other => Self::SubmissionFailed {
                reason: other.to_string(),
            },
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidAmount { reason } => write!(f, "invalid amount {reason}"),
            Self::EncryptionFailed { reason } => write!(f, "encryption failed: {reason}"),
            Self::NotConnected => write!(f, "wallet not connected"),
            Self::SubmissionRejected { reason } => write!(f, "submission rejected: {reason}"),
            Self::SubmissionFailed { reason } => write!(f, "submission failed: {reason}"),
            Self::Reverted { reason } => write!(f, "reverted: {reason}"),
            Self::DroppedOrTimedOut => write!(f, "dropped or timed out"),
            Self::IdentityChanged => write!(f, "identity changed"),
        }
    }
}

/// Lifecycle state of a transaction record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxState {
    Pending,
    Confirmed,
    Failed(FailureReason),
}

impl TxState {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for TxState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Confirmed => write!(f, "CONFIRMED"),
            Self::Failed(reason) => write!(f, "FAILED({reason})"),
        }
    }
}

/// One operation's journey through the client. Lives in memory only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: RecordId,
    pub operation: Operation,
    pub submitted_at: DateTime<Utc>,
    pub state: TxState,
    /// Present once the signer accepted the call.
    pub tx_hash: Option<TxHash>,
    /// Set when the record reaches a terminal state.
    pub resolved_at: Option<DateTime<Utc>>,
}

impl TransactionRecord {
    #[must_use]
    pub fn pending(id: RecordId, operation: Operation, tx_hash: TxHash) -> Self {
        Self {
            id,
            operation,
            submitted_at: Utc::now(),
            state: TxState::Pending,
            tx_hash: Some(tx_hash),
            resolved_at: None,
        }
    }

    /// A record that failed before ever reaching the chain.
    #[must_use]
    pub fn rejected(id: RecordId, operation: Operation, reason: FailureReason) -> Self {
        let now = Utc::now();
        Self {
            id,
            operation,
            submitted_at: now,
            state: TxState::Failed(reason),
            tx_hash: None,
            resolved_at: Some(now),
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// The failure reason, if failed.
    #[must_use]
    pub fn failure(&self) -> Option<&FailureReason> {
        match &self.state {
            TxState::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}

/// Outcome of an included transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReceiptStatus {
    Success,
    Reverted { reason: String },
}

/// What the node reports once a transaction is included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub tx_hash: TxHash,
    pub block_number: u64,
    pub status: ReceiptStatus,
}
