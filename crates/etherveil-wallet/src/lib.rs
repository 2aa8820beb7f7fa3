//! # etherveil-wallet
//!
//! Wallet session for the EtherVeil vault client.
//!
//! - **Connector**: the polymorphic provider capability (`connect`,
//!   `disconnect`, `submit`), collected in a [`ConnectorSet`]
//! - **WalletSession**: the `Disconnected → Connecting → Connected` state
//!   machine and sole owner of the signing identity
//! - **WalletEvent**: provider-side account / chain / disconnect events
//!
//! ```text
//! UI ─connect(kind)─▶ WalletSession ─▶ Connector ─▶ wallet
//!                         │
//!                         └── watch<SessionState> ──▶ orchestrator, cache
//! ```

pub mod connector;
#[cfg(any(test, feature = "test-helpers"))]
pub mod fake;
pub mod session;

pub use connector::{Connector, ConnectorSet};
pub use session::{PendingSubmission, WalletEvent, WalletSession};
