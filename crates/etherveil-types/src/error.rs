//! Error types for the EtherVeil vault client.
//!
//! All errors use the `EV_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Operation validation errors
//! - 2xx: Amount encoding errors
//! - 3xx: Wallet session errors
//! - 4xx: Submission errors
//! - 5xx: Receipt / lifecycle errors
//! - 6xx: Node read errors
//! - 9xx: General / internal errors

use thiserror::Error;

use crate::{ConnectorKind, OperationId, TxHash};

/// Central error enum for all EtherVeil client operations.
///
/// `Clone` so a single in-flight portfolio read can hand the same failure to
/// every caller attached to it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VaultError {
    // =================================================================
    // Operation Errors (1xx)
    // =================================================================
    /// The operation failed local shape validation.
    #[error("EV_ERR_100: Invalid operation: {reason}")]
    InvalidOperation { reason: String },

    /// This operation instance was already handed to the orchestrator.
    #[error("EV_ERR_101: Operation already executed: {0}")]
    DuplicateOperation(OperationId),

    /// The asset id is not in the configured registry.
    #[error("EV_ERR_102: Unknown asset: {0}")]
    UnknownAsset(u64),

    // =================================================================
    // Amount Errors (2xx)
    // =================================================================
    /// The plaintext amount is not a positive, correctly scaled decimal.
    #[error("EV_ERR_200: Invalid amount '{input}': {reason}")]
    InvalidAmount { input: String, reason: String },

    /// The encryptor could not produce a ciphertext/proof pair.
    #[error("EV_ERR_201: Encryption failed: {reason}")]
    EncryptionFailed { reason: String },

    // =================================================================
    // Wallet Errors (3xx)
    // =================================================================
    /// No identity is present; the wallet is not connected.
    #[error("EV_ERR_300: Wallet not connected")]
    NotConnected,

    /// The user (or the provider) rejected the connection request.
    #[error("EV_ERR_301: Connection rejected: {reason}")]
    ConnectionRejected { reason: String },

    /// The selected provider is not registered or not installed.
    #[error("EV_ERR_302: No provider available: {0}")]
    NoProviderAvailable(ConnectorKind),

    /// A connect was requested while another attempt is still pending.
    #[error("EV_ERR_303: Connection already in progress")]
    ConnectionInProgress,

    /// The signing identity changed while the call was in flight.
    #[error("EV_ERR_304: Identity changed")]
    IdentityChanged,

    // =================================================================
    // Submission Errors (4xx)
    // =================================================================
    /// The signer refused the call (user rejected, insufficient funds).
    #[error("EV_ERR_400: Submission rejected: {reason}")]
    SubmissionRejected { reason: String },

    /// The call could not be delivered (network or node error).
    #[error("EV_ERR_401: Submission failed: {reason}")]
    SubmissionFailed { reason: String },

    // =================================================================
    // Receipt Errors (5xx)
    // =================================================================
    /// The transaction was included but the contract reverted.
    #[error("EV_ERR_500: Transaction {tx} reverted: {reason}")]
    Reverted { tx: TxHash, reason: String },

    /// The transaction was never observed within the watch window.
    #[error("EV_ERR_501: Transaction {0} dropped or timed out")]
    DroppedOrTimedOut(TxHash),

    // =================================================================
    // Node Read Errors (6xx)
    // =================================================================
    /// A view call against the node failed.
    #[error("EV_ERR_600: Node read failed: {reason}")]
    NodeRead { reason: String },

    /// The asset exists on-chain but is flagged unsupported.
    #[error("EV_ERR_601: Asset not supported: {0}")]
    AssetNotSupported(u64),

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("EV_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("EV_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid config document, missing fields, etc.).
    #[error("EV_ERR_902: Configuration error: {0}")]
    Configuration(String),
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, VaultError>;

impl From<serde_json::Error> for VaultError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
