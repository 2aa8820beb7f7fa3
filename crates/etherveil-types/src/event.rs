//! Status events reported to the UI through the notification sink.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{FailureReason, Operation, RecordId};

/// A human-facing lifecycle event.
///
/// Every record produces exactly one terminal event (`Confirmed` or
/// `Failed`). `Submitted` is only ever sent for calls the signer accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VaultEvent {
    Submitted {
        record_id: RecordId,
        operation: Operation,
    },
    Confirmed {
        record_id: RecordId,
    },
    Failed {
        record_id: RecordId,
        reason: FailureReason,
    },
}

impl VaultEvent {
    #[must_use]
    pub fn record_id(&self) -> RecordId {
        match self {
            Self::Submitted { record_id, .. }
            | Self::Confirmed { record_id }
            | Self::Failed { record_id, .. } => *record_id,
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Submitted { .. })
    }

    /// Short title, as a toast would show it.
    #[must_use]
    pub fn title(&self) -> &'static str {
        match self {
            Self::Submitted { .. } => "Transaction Submitted",
            Self::Confirmed { .. } => "Transaction Confirmed",
            Self::Failed { .. } => "Transaction Failed",
        }
    }
}

impl fmt::Display for VaultEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Submitted {
                record_id,
                operation,
            } => write!(f, "{}: {record_id} {operation}", self.title()),
            Self::Confirmed { record_id } => write!(f, "{}: {record_id}", self.title()),
            Self::Failed { record_id, reason } => {
                write!(f, "{}: {record_id} {reason}", self.title())
            }
        }
    }
}
