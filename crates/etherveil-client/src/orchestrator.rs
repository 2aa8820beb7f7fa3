//! Transaction orchestrator.
//!
//! Turns an [`Operation`] into a tracked transaction:
//!
//! ```text
//! validate ─▶ identity? ─▶ encode ─▶ sign_and_submit ─▶ Pending ─▶ watch receipt
//!    │            │           │             │                          │
//!    ▼            ▼           ▼             ▼                          ▼
//!  Err(..)     Failed      Failed        Failed              Confirmed | Failed
//! ```
//!
//! Shape errors are returned to the caller. Everything after that yields a
//! record; records that fail before the signer accepts them are created
//! already `Failed` and only ever produce a `Failed` event. Accepted calls
//! get exactly one receipt watcher, bounded by the configured timeout and
//! cancelled by an identity change. Nothing is retried.

use std::{sync::Arc, time::Duration};

use etherveil_types::{
    ContractCall, EncodingContext, EncryptedPayload, FailureReason, Identity, Operation,
    OperationBody, Receipt, ReceiptStatus, RecordId, Result, SessionId, SessionState, TransactionRecord,
    TxHash, TxState, VaultCall, VaultConfig, VaultError, VaultEvent,
};
use etherveil_wallet::{PendingSubmission, WalletSession};
use tokio::{sync::watch, time::error::Elapsed};

use crate::{
    AmountCodec, NotificationSink, PortfolioStateCache, RecordBook, TrackedTransaction,
    VaultNode,
};

/// Runs operations against the vault on behalf of the connected identity.
pub struct TransactionOrchestrator {
    config: Arc<VaultConfig>,
    session: Arc<WalletSession>,
    codec: AmountCodec,
    node: Arc<dyn VaultNode>,
    cache: PortfolioStateCache,
    sink: Arc<dyn NotificationSink>,
    records: Arc<RecordBook>,
}

impl TransactionOrchestrator {
    #[must_use]
    pub fn new(
        config: Arc<VaultConfig>,
        session: Arc<WalletSession>,
        codec: AmountCodec,
        node: Arc<dyn VaultNode>,
        cache: PortfolioStateCache,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            config,
            session,
            codec,
            node,
            cache,
            sink,
            records: Arc::new(RecordBook::new()),
        }
    }

    /// Execute `operation` and return a handle on its record.
    ///
    /// Returns once the signer has answered; the receipt is watched in the
    /// background and the handle observes the outcome.
    ///
    /// # Errors
    /// - [`VaultError::InvalidOperation`] for malformed operations
    /// - [`VaultError::DuplicateOperation`] if this operation id already ran
    ///
    /// Every other failure is reported through a `Failed` record.
    pub async fn execute(&self, operation: Operation) -> Result<TrackedTransaction> {
        self.validate(&operation)?;
        self.records.claim(operation.id())?;

        let Some(identity) = self.session.identity() else {
            return self.reject(operation, FailureReason::NotConnected);
        };

        let call = match self.build_call(&operation, &identity) {
            Ok(call) => call,
            Err(err) => return self.reject(operation, FailureReason::from_error(&err)),
        };

        let submission = match self.session.sign_and_submit(call, identity.session).await {
            Ok(submission) => submission,
            Err(err) => return self.reject(operation, FailureReason::from_error(&err)),
        };

        let id = self.records.next_id()?;
        let tracked = self.records.insert(TransactionRecord::pending(
            id,
            operation.clone(),
            submission.tx_hash,
        ))?;
        tracing::info!(
            record = %id,
            tx = %submission.tx_hash,
            operation = %operation,
            "Transaction submitted"
        );
        self.sink.report(&VaultEvent::Submitted {
            record_id: id,
            operation,
        });
        self.watch_receipt(id, &submission)?;
        Ok(tracked)
    }

    #[must_use]
    pub fn record(&self, id: RecordId) -> Option<TransactionRecord> {
        self.records.get(id)
    }

    /// Every record of this session, oldest first.
    #[must_use]
    pub fn records(&self) -> Vec<TransactionRecord> {
        self.records.all()
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.records.pending_count()
    }

    /// Receipt watchers spawned so far.
    #[must_use]
    pub fn watchers_started(&self) -> u64 {
        self.records.watchers_started()
    }

    #[must_use]
    pub fn cache(&self) -> &PortfolioStateCache {
        &self.cache
    }

    // -----------------------------------------------------------------------
    // Steps
    // -----------------------------------------------------------------------

    fn validate(&self, operation: &Operation) -> Result<()> {
        let invalid = |reason: String| Err(VaultError::InvalidOperation { reason });

        if let Some(asset_id) = operation.asset_id() {
            if self.config.asset(asset_id).is_none() {
                return invalid(format!("unknown asset {asset_id}"));
            }
        }
        if let Some(amount) = operation.amount() {
            if amount.trim().is_empty() {
                return invalid("amount is empty".into());
            }
        }
        if let OperationBody::Transfer { to, .. } = operation.body() {
            if to.is_zero() {
                return invalid("transfer recipient is the zero address".into());
            }
        }
        Ok(())
    }

    fn build_call(&self, operation: &Operation, identity: &Identity) -> Result<ContractCall> {
        let call = match operation.body() {
            OperationBody::Deposit { asset_id, amount } => VaultCall::Deposit {
                asset_id: *asset_id,
                payload: self.encode(operation, identity, amount)?,
            },
            OperationBody::Withdraw { asset_id, amount } => VaultCall::Withdraw {
                asset_id: *asset_id,
                payload: self.encode(operation, identity, amount)?,
            },
            OperationBody::Transfer {
                to,
                asset_id,
                amount,
            } => VaultCall::Transfer {
                to: *to,
                asset_id: *asset_id,
                payload: self.encode(operation, identity, amount)?,
            },
            OperationBody::SetPrivacy { is_private } => VaultCall::SetPortfolioPrivacy {
                is_private: *is_private,
            },
            OperationBody::CreatePosition { asset_id, amount } => VaultCall::CreatePosition {
                asset_id: *asset_id,
                payload: self.encode(operation, identity, amount)?,
            },
        };
        Ok(ContractCall {
            contract: self.config.contract_address,
            chain_id: identity.chain_id,
            call,
        })
    }

    fn encode(
        &self,
        operation: &Operation,
        identity: &Identity,
        amount: &str,
    ) -> Result<EncryptedPayload> {
        let asset_id = operation.asset_id().ok_or_else(|| {
            VaultError::Internal(format!("{} carries an amount but no asset", operation.kind()))
        })?;
        let context = EncodingContext {
            asset_id,
            kind: operation.kind(),
            signer: identity.address,
            chain_id: identity.chain_id,
            contract: self.config.contract_address,
        };
        self.codec.encode(amount, &context)
    }

    /// Record a failure that happened before the signer accepted the call.
    fn reject(&self, operation: Operation, reason: FailureReason) -> Result<TrackedTransaction> {
        let id = self.records.next_id()?;
        tracing::warn!(
            record = %id,
            operation = %operation,
            reason = %reason,
            "Transaction failed before submission"
        );
        let tracked = self
            .records
            .insert(TransactionRecord::rejected(id, operation, reason.clone()))?;
        self.sink.report(&VaultEvent::Failed {
            record_id: id,
            reason,
        });
        Ok(tracked)
    }

    fn watch_receipt(&self, id: RecordId, submission: &PendingSubmission) -> Result<()> {
        if !self.records.begin_watch(id)? {
            return Ok(());
        }

        let watcher = ReceiptWatcher {
            id,
            tx: submission.tx_hash,
            session: submission.identity.session,
            timeout: self.config.receipt_timeout(),
            node: Arc::clone(&self.node),
            identity: self.session.subscribe(),
            records: Arc::clone(&self.records),
            cache: self.cache.clone(),
            sink: Arc::clone(&self.sink),
        };
        tokio::spawn(watcher.run());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ReceiptWatcher
// ---------------------------------------------------------------------------

/// Background task that resolves one pending record.
struct ReceiptWatcher {
    id: RecordId,
    tx: TxHash,
    /// Session the transaction was signed under.
    session: SessionId,
    timeout: Duration,
    node: Arc<dyn VaultNode>,
    identity: watch::Receiver<SessionState>,
    records: Arc<RecordBook>,
    cache: PortfolioStateCache,
    sink: Arc<dyn NotificationSink>,
}

impl ReceiptWatcher {
    async fn run(mut self) {
        tracing::debug!(record = %self.id, tx = %self.tx, "Watching for receipt");
        let session = self.session;
        let state = tokio::select! {
            biased;
            outcome = tokio::time::timeout(self.timeout, self.node.wait_for_receipt(self.tx)) => {
                classify(self.id, outcome)
            }
            () = identity_lost(&mut self.identity, session) => {
                TxState::Failed(FailureReason::IdentityChanged)
            }
        };
        self.finish(state);
    }

    fn finish(&self, state: TxState) {
        let record = match self.records.resolve(self.id, state) {
            Ok(Some(record)) => record,
            Ok(None) => return,
            Err(err) => {
                tracing::error!(record = %self.id, error = %err, "Could not resolve record");
                return;
            }
        };

        match &record.state {
            TxState::Confirmed => {
                tracing::info!(record = %self.id, tx = %self.tx, "Transaction confirmed");
                self.cache.invalidate();
                self.sink.report(&VaultEvent::Confirmed { record_id: self.id });
            }
            TxState::Failed(reason) => {
                tracing::warn!(
                    record = %self.id,
                    tx = %self.tx,
                    reason = %reason,
                    "Transaction failed"
                );
                self.sink.report(&VaultEvent::Failed {
                    record_id: self.id,
                    reason: reason.clone(),
                });
            }
            TxState::Pending => {}
        }
    }
}

fn classify(id: RecordId, outcome: std::result::Result<Result<Receipt>, Elapsed>) -> TxState {
    match outcome {
        Ok(Ok(receipt)) => match receipt.status {
            ReceiptStatus::Success => TxState::Confirmed,
            ReceiptStatus::Reverted { reason } => {
                TxState::Failed(FailureReason::Reverted { reason })
            }
        },
        Ok(Err(err)) => {
            tracing::warn!(record = %id, error = %err, "Receipt watch failed");
            TxState::Failed(FailureReason::DroppedOrTimedOut)
        }
        Err(_) => TxState::Failed(FailureReason::DroppedOrTimedOut),
    }
}

/// Resolves once the session no longer matches `session`, or the wallet
/// session itself is gone.
async fn identity_lost(identity: &mut watch::Receiver<SessionState>, session: SessionId) {
    let _ = identity
        .wait_for(|state| state.session() != Some(session))
        .await;
}
