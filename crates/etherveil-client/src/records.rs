//! Session-local transaction records.
//!
//! The [`RecordBook`] assigns record ids, refuses to run the same
//! [`OperationId`] twice, and owns one `watch` channel per record so that
//! holders of a [`TrackedTransaction`] see every transition. Terminal
//! records are immutable: once `Confirmed` or `Failed`, later updates are
//! ignored.

use std::{
    collections::{BTreeMap, HashSet},
    sync::{Mutex, MutexGuard},
};

use chrono::Utc;
use etherveil_types::{OperationId, RecordId, Result, TransactionRecord, TxState, VaultError};
use tokio::sync::watch;

/// All records of the current application session.
pub struct RecordBook {
    inner: Mutex<BookInner>,
}

struct BookInner {
    last_id: RecordId,
    /// Operations already accepted into the book.
    executed: HashSet<OperationId>,
    records: BTreeMap<RecordId, watch::Sender<TransactionRecord>>,
    /// Records that currently have a receipt watcher.
    watching: HashSet<RecordId>,
    watchers_started: u64,
}

impl RecordBook {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(BookInner {
                last_id: RecordId(0),
                executed: HashSet::new(),
                records: BTreeMap::new(),
                watching: HashSet::new(),
                watchers_started: 0,
            }),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, BookInner>> {
        self.inner
            .lock()
            .map_err(|_| VaultError::Internal("record book lock poisoned".into()))
    }

    /// Register `id` as executed.
    ///
    /// # Errors
    /// Returns [`VaultError::DuplicateOperation`] if it was seen before.
    pub fn claim(&self, id: OperationId) -> Result<()> {
        let mut inner = self.lock()?;
        if !inner.executed.insert(id) {
            return Err(VaultError::DuplicateOperation(id));
        }
        Ok(())
    }

    /// Next sequential record id, starting at 1.
    pub fn next_id(&self) -> Result<RecordId> {
        let mut inner = self.lock()?;
        inner.last_id = inner.last_id.next();
        Ok(inner.last_id)
    }

    /// Store a new record and hand back a tracker for it.
    pub fn insert(&self, record: TransactionRecord) -> Result<TrackedTransaction> {
        let id = record.id;
        let (tx, rx) = watch::channel(record);
        self.lock()?.records.insert(id, tx);
        Ok(TrackedTransaction { id, rx })
    }

    /// Mark `id` as watched. Returns `false` if a watcher is already
    /// running or the record is already terminal.
    pub fn begin_watch(&self, id: RecordId) -> Result<bool> {
        let mut inner = self.lock()?;
        let watchable = inner
            .records
            .get(&id)
            .is_some_and(|tx| !tx.borrow().is_terminal());
        if !watchable || !inner.watching.insert(id) {
            return Ok(false);
        }
        inner.watchers_started += 1;
        Ok(true)
    }

    /// Move a pending record to a terminal `state`.
    ///
    /// Returns the updated record, or `None` if it was already terminal
    /// (or unknown), in which case nothing changes.
    pub fn resolve(&self, id: RecordId, state: TxState) -> Result<Option<TransactionRecord>> {
        let mut inner = self.lock()?;
        inner.watching.remove(&id);
        let Some(tx) = inner.records.get(&id) else {
            return Ok(None);
        };
        let moved = tx.send_if_modified(|record| {
            if record.is_terminal() {
                return false;
            }
            record.state = state;
            record.resolved_at = Some(Utc::now());
            true
        });
        Ok(moved.then(|| tx.borrow().clone()))
    }

    #[must_use]
    pub fn get(&self, id: RecordId) -> Option<TransactionRecord> {
        let inner = self.lock().ok()?;
        inner.records.get(&id).map(|tx| tx.borrow().clone())
    }

    /// Every record, oldest first.
    #[must_use]
    pub fn all(&self) -> Vec<TransactionRecord> {
        self.lock()
            .map(|inner| inner.records.values().map(|tx| tx.borrow().clone()).collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.lock()
            .map(|inner| {
                inner
                    .records
                    .values()
                    .filter(|tx| !tx.borrow().is_terminal())
                    .count()
            })
            .unwrap_or_default()
    }

    /// Receipt watchers started over the book's lifetime.
    #[must_use]
    pub fn watchers_started(&self) -> u64 {
        self.lock().map(|inner| inner.watchers_started).unwrap_or_default()
    }

    #[must_use]
    pub fn active_watchers(&self) -> usize {
        self.lock().map(|inner| inner.watching.len()).unwrap_or_default()
    }
}

impl Default for RecordBook {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// TrackedTransaction
// ---------------------------------------------------------------------------

/// Caller-side handle on one record.
#[derive(Debug, Clone)]
pub struct TrackedTransaction {
    id: RecordId,
    rx: watch::Receiver<TransactionRecord>,
}

impl TrackedTransaction {
    #[must_use]
    pub fn id(&self) -> RecordId {
        self.id
    }

    /// The record as it stands now.
    #[must_use]
    pub fn current(&self) -> TransactionRecord {
        self.rx.borrow().clone()
    }

    #[must_use]
    pub fn state(&self) -> TxState {
        self.rx.borrow().state.clone()
    }

    /// Wait for the record to reach `Confirmed` or `Failed`.
    ///
    /// If the book is dropped first, returns the last state seen.
    pub async fn settled(&mut self) -> TransactionRecord {
        let _ = self.rx.wait_for(TransactionRecord::is_terminal).await;
        self.rx.borrow().clone()
    }

    /// Wait for the next transition.
    pub async fn changed(&mut self) -> Option<TransactionRecord> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use etherveil_types::{AssetId, FailureReason, Operation, TxHash};

    fn pending(book: &RecordBook) -> TrackedTransaction {
        let id = book.next_id().unwrap();
        let op = Operation::deposit(AssetId(1), "1");
        book.insert(TransactionRecord::pending(id, op, TxHash::random()))
            .unwrap()
    }

    #[test]
    fn ids_are_sequential() {
        let book = RecordBook::new();
        assert_eq!(book.next_id().unwrap(), RecordId(1));
        assert_eq!(book.next_id().unwrap(), RecordId(2));
        assert_eq!(book.next_id().unwrap(), RecordId(3));
    }

    #[test]
    fn duplicate_operation_rejected() {
        let book = RecordBook::new();
        let op = OperationId::new();
        book.claim(op).unwrap();
        let err = book.claim(op).unwrap_err();
        assert!(
            matches!(err, VaultError::DuplicateOperation(id) if id == op),
            "Expected DuplicateOperation, got: {err:?}"
        );
        assert!(book.claim(OperationId::new()).is_ok());
    }

    #[test]
    fn terminal_records_do_not_move() {
        let book = RecordBook::new();
        let tracked = pending(&book);

        let resolved = book.resolve(tracked.id(), TxState::Confirmed).unwrap();
        assert_eq!(resolved.unwrap().state, TxState::Confirmed);

        let again = book
            .resolve(
                tracked.id(),
                TxState::Failed(FailureReason::DroppedOrTimedOut),
            )
            .unwrap();
        assert!(again.is_none());
        assert_eq!(tracked.state(), TxState::Confirmed);
        assert!(tracked.current().resolved_at.is_some());
    }

    #[test]
    fn one_watcher_per_record() {
        let book = RecordBook::new();
        let tracked = pending(&book);

        assert!(book.begin_watch(tracked.id()).unwrap());
        assert!(!book.begin_watch(tracked.id()).unwrap());
        assert_eq!(book.active_watchers(), 1);

        book.resolve(tracked.id(), TxState::Confirmed).unwrap();
        assert_eq!(book.active_watchers(), 0);
        assert!(!book.begin_watch(tracked.id()).unwrap());
        assert_eq!(book.watchers_started(), 1);
    }

    #[test]
    fn rejected_records_are_never_watched() {
        let book = RecordBook::new();
        let id = book.next_id().unwrap();
        let op = Operation::set_privacy(true);
        book.insert(TransactionRecord::rejected(id, op, FailureReason::NotConnected))
            .unwrap();
        assert!(!book.begin_watch(id).unwrap());
        assert_eq!(book.pending_count(), 0);
    }

    #[tokio::test]
    async fn settled_waits_for_terminal_state() {
        let book = std::sync::Arc::new(RecordBook::new());
        let mut tracked = pending(&book);
        assert_eq!(tracked.state(), TxState::Pending);

        let id = tracked.id();
        let resolver = std::sync::Arc::clone(&book);
        tokio::spawn(async move {
            resolver.resolve(id, TxState::Confirmed).unwrap();
        });

        let record = tracked.settled().await;
        assert_eq!(record.state, TxState::Confirmed);
        assert_eq!(book.all().len(), 1);
        assert_eq!(book.get(id).unwrap().state, TxState::Confirmed);
    }
}
