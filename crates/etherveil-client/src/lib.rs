//! # etherveil-client
//!
//! Transaction lifecycle core for the **EtherVeil** encrypted asset vault.
//!
//! - [`AmountCodec`]: plaintext decimal → base units → encrypted payload
//! - [`TransactionOrchestrator`]: validate, encode, sign, watch the receipt
//! - [`RecordBook`] / [`TrackedTransaction`]: session-local transaction records
//! - [`PortfolioStateCache`]: `Absent` / `Stale` / `Fresh` portfolio snapshot
//! - [`NotificationSink`]: lifecycle events for the UI ([`TracingSink`], [`ChannelSink`])
//! - [`VaultNode`]: the read boundary to the chain
//! - [`VaultClient`]: wires all of the above from one [`etherveil_types::VaultConfig`]
//!
//! ## Data flow
//!
//! ```text
//! UI ─execute(op)─▶ orchestrator ─encode─▶ codec
//!                        │
//!                        ├─sign_and_submit─▶ WalletSession ─▶ Connector
//!                        │
//!                        └─watch receipt─▶ VaultNode
//!                                │
//!                         Confirmed ─▶ cache.invalidate() ─▶ sink.report()
//! ```

pub mod cache;
pub mod client;
pub mod codec;
pub mod node;
pub mod notify;
pub mod orchestrator;
pub mod queries;
pub mod records;
pub mod telemetry;

pub use cache::{CachedPortfolio, PortfolioStateCache};
pub use client::VaultClient;
pub use codec::{AmountCodec, parse_base_units};
pub use node::VaultNode;
pub use notify::{ChannelSink, NotificationSink, TracingSink};
pub use orchestrator::TransactionOrchestrator;
pub use records::{RecordBook, TrackedTransaction};
