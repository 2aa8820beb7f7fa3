//! Shared fakes for the client integration tests.

#![allow(dead_code)]

use std::{
    collections::BTreeMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use etherveil_client::{NotificationSink, VaultClient, VaultNode};
use etherveil_types::{
    Address, AmountEncryptor, AssetId, AssetInfo, ConnectorKind, DeterministicEncryptor,
    EncodingContext, EncryptedPayload, PortfolioInfo, PositionInfo, Receipt, ReceiptStatus,
    RecordId, Result, TxHash, VaultConfig, VaultError, VaultEvent,
};
use etherveil_wallet::{Connector, ConnectorSet, fake::FakeConnector};
use tokio::sync::Notify;

// ---------------------------------------------------------------------------
// FakeNode
// ---------------------------------------------------------------------------

/// How the fake node answers `wait_for_receipt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiptMode {
    Succeed,
    Revert(String),
    /// The watch itself errors.
    Error(String),
    /// Never included.
    Never,
    /// Waits for [`FakeNode::release_receipt`], then succeeds.
    Gate,
}

pub struct FakeNode {
    total_value: Mutex<u64>,
    is_private: AtomicBool,
    user_balance: Mutex<u64>,
    balances: Mutex<BTreeMap<AssetId, u64>>,
    assets: Mutex<BTreeMap<AssetId, AssetInfo>>,
    positions: Mutex<BTreeMap<u64, PositionInfo>>,
    receipt_mode: Mutex<ReceiptMode>,
    gate: Notify,
    portfolio_reads: AtomicUsize,
    receipt_waits: AtomicUsize,
}

impl FakeNode {
    pub fn new() -> Self {
        Self {
            total_value: Mutex::new(0),
            is_private: AtomicBool::new(false),
            user_balance: Mutex::new(0),
            balances: Mutex::new(BTreeMap::new()),
            assets: Mutex::new(BTreeMap::new()),
            positions: Mutex::new(BTreeMap::new()),
            receipt_mode: Mutex::new(ReceiptMode::Succeed),
            gate: Notify::new(),
            portfolio_reads: AtomicUsize::new(0),
            receipt_waits: AtomicUsize::new(0),
        }
    }

    pub fn set_total_value(&self, cents: u64) {
        *self.total_value.lock().unwrap() = cents;
    }

    pub fn set_private(&self, is_private: bool) {
        self.is_private.store(is_private, Ordering::SeqCst);
    }

    pub fn set_balance(&self, asset_id: AssetId, amount: u64) {
        self.balances.lock().unwrap().insert(asset_id, amount);
        *self.user_balance.lock().unwrap() = self.balances.lock().unwrap().values().sum();
    }

    pub fn add_asset(&self, asset_id: AssetId, symbol: &str, is_supported: bool) {
        self.assets.lock().unwrap().insert(
            asset_id,
            AssetInfo {
                total_supply: 1_000_000,
                current_price: 2_000,
                is_supported,
                symbol: symbol.to_string(),
                name: symbol.to_string(),
                token_address: Address::random(),
            },
        );
    }

    pub fn add_position(&self, position_id: u64, owner: Address) {
        self.positions.lock().unwrap().insert(
            position_id,
            PositionInfo {
                asset_amount: 5,
                asset_value: 10_000,
                timestamp: 1_700_000_000,
                is_active: true,
                owner,
                asset_symbol: "ETH".into(),
            },
        );
    }

    pub fn set_receipt_mode(&self, mode: ReceiptMode) {
        *self.receipt_mode.lock().unwrap() = mode;
    }

    /// Let one gated receipt through.
    pub fn release_receipt(&self) {
        self.gate.notify_one();
    }

    pub fn portfolio_reads(&self) -> usize {
        self.portfolio_reads.load(Ordering::SeqCst)
    }

    pub fn receipt_waits(&self) -> usize {
        self.receipt_waits.load(Ordering::SeqCst)
    }
}

fn not_found(what: &str) -> VaultError {
    VaultError::NodeRead {
        reason: format!("{what} not found"),
    }
}

#[async_trait]
impl VaultNode for FakeNode {
    async fn get_portfolio_info(&self, owner: Address) -> Result<PortfolioInfo> {
        self.portfolio_reads.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        Ok(PortfolioInfo {
            total_value: *self.total_value.lock().unwrap(),
            total_assets: self.balances.lock().unwrap().len() as u64,
            transaction_count: 0,
            is_private: self.is_private.load(Ordering::SeqCst),
            owner,
        })
    }

    async fn get_user_balance(&self, _owner: Address) -> Result<u64> {
        Ok(*self.user_balance.lock().unwrap())
    }

    async fn get_user_asset_balance(&self, _owner: Address, asset_id: AssetId) -> Result<u64> {
        Ok(self
            .balances
            .lock()
            .unwrap()
            .get(&asset_id)
            .copied()
            .unwrap_or_default())
    }

    async fn get_asset_info(&self, asset_id: AssetId) -> Result<AssetInfo> {
        self.assets
            .lock()
            .unwrap()
            .get(&asset_id)
            .cloned()
            .ok_or_else(|| not_found("asset"))
    }

    async fn get_position_info(&self, position_id: u64) -> Result<PositionInfo> {
        self.positions
            .lock()
            .unwrap()
            .get(&position_id)
            .cloned()
            .ok_or_else(|| not_found("position"))
    }

    async fn wait_for_receipt(&self, tx: TxHash) -> Result<Receipt> {
        self.receipt_waits.fetch_add(1, Ordering::SeqCst);
        let mode = self.receipt_mode.lock().unwrap().clone();
        let status = match mode {
            ReceiptMode::Succeed => ReceiptStatus::Success,
            ReceiptMode::Revert(reason) => ReceiptStatus::Reverted { reason },
            ReceiptMode::Error(reason) => return Err(VaultError::NodeRead { reason }),
            ReceiptMode::Never => std::future::pending().await,
            ReceiptMode::Gate => {
                self.gate.notified().await;
                ReceiptStatus::Success
            }
        };
        Ok(Receipt {
            tx_hash: tx,
            block_number: 42,
            status,
        })
    }
}

// ---------------------------------------------------------------------------
// RecordingSink
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<VaultEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<VaultEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn titles(&self) -> Vec<&'static str> {
        self.events().iter().map(VaultEvent::title).collect()
    }

    pub fn for_record(&self, id: RecordId) -> Vec<VaultEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.record_id() == id)
            .collect()
    }

    pub fn terminal_count(&self, id: RecordId) -> usize {
        self.for_record(id).iter().filter(|e| e.is_terminal()).count()
    }
}

impl NotificationSink for RecordingSink {
    fn report(&self, event: &VaultEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

// ---------------------------------------------------------------------------
// CountingEncryptor
// ---------------------------------------------------------------------------

/// [`DeterministicEncryptor`] that counts calls and can be told to fail.
#[derive(Default)]
pub struct CountingEncryptor {
    calls: AtomicUsize,
    fail: AtomicBool,
}

impl CountingEncryptor {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn fail_next(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

impl AmountEncryptor for CountingEncryptor {
    fn encrypt(&self, base_units: u128, context: &EncodingContext) -> Result<EncryptedPayload> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(VaultError::EncryptionFailed {
                reason: "prover unavailable".into(),
            });
        }
        DeterministicEncryptor.encrypt(base_units, context)
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub connector: Arc<FakeConnector>,
    pub node: Arc<FakeNode>,
    pub encryptor: Arc<CountingEncryptor>,
    pub sink: Arc<RecordingSink>,
    pub client: VaultClient,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(VaultConfig::dummy())
    }

    pub fn with_config(config: VaultConfig) -> Self {
        let connector = Arc::new(FakeConnector::new(ConnectorKind::Injected));
        let node = Arc::new(FakeNode::new());
        let encryptor = Arc::new(CountingEncryptor::default());
        let sink = Arc::new(RecordingSink::default());
        let client = VaultClient::new(
            config,
            ConnectorSet::new().with(Arc::clone(&connector) as Arc<dyn Connector>),
            Arc::clone(&node) as Arc<dyn VaultNode>,
            Arc::clone(&encryptor) as Arc<dyn AmountEncryptor>,
            Arc::clone(&sink) as Arc<dyn NotificationSink>,
        )
        .expect("harness client");
        Self {
            connector,
            node,
            encryptor,
            sink,
            client,
        }
    }

    /// A harness already connected through the injected provider.
    pub async fn connected() -> Self {
        let harness = Self::new();
        harness
            .client
            .connect(ConnectorKind::Injected)
            .await
            .expect("connect");
        harness
    }

    pub fn account(&self) -> Address {
        self.connector.account().address
    }
}
