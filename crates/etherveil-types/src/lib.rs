//! # etherveil-types
//!
//! Shared types, errors, and configuration for the **EtherVeil** vault client.
//!
//! This crate is the leaf dependency of the workspace. It defines:
//!
//! - **Identifiers**: [`OperationId`], [`SessionId`], [`RecordId`], [`AssetId`], [`ChainId`], [`Address`], [`TxHash`]
//! - **Identity**: [`Identity`], [`SessionState`], [`ConnectorKind`]
//! - **Operations**: [`Operation`], [`OperationBody`], [`OperationKind`]
//! - **Calls**: [`ContractCall`], [`VaultCall`], [`EncryptedPayload`], [`EncodingContext`], [`AmountEncryptor`]
//! - **Lifecycle**: [`TransactionRecord`], [`TxState`], [`FailureReason`], [`Receipt`]
//! - **Read views**: [`PortfolioSnapshot`], [`PortfolioInfo`], [`AssetInfo`], [`PositionInfo`]
//! - **Events**: [`VaultEvent`]
//! - **Configuration**: [`VaultConfig`], [`ChainConfig`], [`AssetConfig`], [`AppMetadata`]
//! - **Errors**: [`VaultError`] with `EV_ERR_` prefix codes
//! - **Constants**: defaults and limits

pub mod call;
pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod identity;
pub mod ids;
pub mod operation;
pub mod portfolio;
pub mod record;

// Re-export all primary types at crate root for ergonomic imports:
//   use etherveil_types::{Operation, TransactionRecord, VaultError, ...};

pub use call::*;
pub use config::*;
pub use error::*;
pub use event::*;
pub use identity::*;
pub use ids::*;
pub use operation::*;
pub use portfolio::*;
pub use record::*;

// Constants are accessed via `etherveil_types::constants::FOO`.
