//! Scriptable in-memory connector for tests.

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Mutex,
};

use async_trait::async_trait;
use etherveil_types::{
    constants, Address, ChainId, ConnectedAccount, ConnectorKind, ContractCall, Result, TxHash,
    VaultError,
};
use tokio::sync::Notify;

/// How the fake answers `connect`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectBehavior {
    Approve,
    Reject,
    /// Never answers.
    Hang,
}

/// How the fake answers `submit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitBehavior {
    Accept,
    Reject(String),
    Fail(String),
    /// Waits for [`FakeConnector::release_submission`], then accepts.
    Hold,
}

/// A connector whose answers are set by the test.
pub struct FakeConnector {
    kind: ConnectorKind,
    available: bool,
    account: Mutex<ConnectedAccount>,
    connect_behavior: Mutex<ConnectBehavior>,
    submit_behavior: Mutex<SubmitBehavior>,
    submissions: Mutex<Vec<ContractCall>>,
    connects: AtomicUsize,
    disconnects: AtomicUsize,
    release: Notify,
    hold_disconnect: AtomicBool,
    disconnect_release: Notify,
}

impl FakeConnector {
    /// Approves connections with a random account on Sepolia and accepts
    /// every submission.
    pub fn new(kind: ConnectorKind) -> Self {
        Self {
            kind,
            available: true,
            account: Mutex::new(ConnectedAccount {
                address: Address::random(),
                chain_id: ChainId(constants::SEPOLIA_CHAIN_ID),
            }),
            connect_behavior: Mutex::new(ConnectBehavior::Approve),
            submit_behavior: Mutex::new(SubmitBehavior::Accept),
            submissions: Mutex::new(Vec::new()),
            connects: AtomicUsize::new(0),
            disconnects: AtomicUsize::new(0),
            release: Notify::new(),
            hold_disconnect: AtomicBool::new(false),
            disconnect_release: Notify::new(),
        }
    }

    /// Report the provider as not installed.
    #[must_use]
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    pub fn set_account(&self, account: ConnectedAccount) {
        *self.account.lock().expect("fake lock") = account;
    }

    pub fn account(&self) -> ConnectedAccount {
        *self.account.lock().expect("fake lock")
    }

    pub fn set_connect_behavior(&self, behavior: ConnectBehavior) {
        *self.connect_behavior.lock().expect("fake lock") = behavior;
    }

    pub fn set_submit_behavior(&self, behavior: SubmitBehavior) {
        *self.submit_behavior.lock().expect("fake lock") = behavior;
    }

    /// Let one held submission through.
    pub fn release_submission(&self) {
        self.release.notify_one();
    }

    /// While set, `disconnect` waits for [`FakeConnector::release_disconnect`].
    pub fn hold_disconnect(&self, hold: bool) {
        self.hold_disconnect.store(hold, Ordering::SeqCst);
    }

    /// Let one held disconnect through.
    pub fn release_disconnect(&self) {
        self.disconnect_release.notify_one();
    }

    /// Every call that reached `submit`, in order.
    pub fn submissions(&self) -> Vec<ContractCall> {
        self.submissions.lock().expect("fake lock").clone()
    }

    pub fn submission_count(&self) -> usize {
        self.submissions.lock().expect("fake lock").len()
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn disconnect_count(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl crate::Connector for FakeConnector {
    fn kind(&self) -> ConnectorKind {
        self.kind
    }

    fn is_available(&self) -> bool {
        self.available
    }

    async fn connect(&self) -> Result<ConnectedAccount> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let behavior = self.connect_behavior.lock().expect("fake lock").clone();
        match behavior {
            ConnectBehavior::Approve => Ok(self.account()),
            ConnectBehavior::Reject => Err(VaultError::ConnectionRejected {
                reason: "user rejected the request".into(),
            }),
            ConnectBehavior::Hang => std::future::pending().await,
        }
    }

    async fn disconnect(&self) -> Result<()> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        if self.hold_disconnect.load(Ordering::SeqCst) {
            self.disconnect_release.notified().await;
        }
        Ok(())
    }

    async fn submit(&self, call: &ContractCall, _from: Address) -> Result<TxHash> {
        self.submissions.lock().expect("fake lock").push(call.clone());
        let behavior = self.submit_behavior.lock().expect("fake lock").clone();
        match behavior {
            SubmitBehavior::Accept => Ok(TxHash::random()),
            SubmitBehavior::Reject(reason) => Err(VaultError::SubmissionRejected { reason }),
            SubmitBehavior::Fail(reason) => Err(VaultError::SubmissionFailed { reason }),
            SubmitBehavior::Hold => {
                self.release.notified().await;
                Ok(TxHash::random())
            }
        }
    }
}
