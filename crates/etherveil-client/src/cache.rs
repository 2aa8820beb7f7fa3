//! Portfolio state cache.
//!
//! Holds the last portfolio snapshot read for the connected identity and
//! reports it as `Absent`, `Stale` or `Fresh`:
//!
//! - a confirmed transaction calls [`PortfolioStateCache::invalidate`],
//!   which marks the held snapshot stale but keeps it readable
//! - a snapshot read under a different wallet session is stale
//! - a read that was already running when an invalidation arrived lands
//!   as stale, never fresh
//!
//! Concurrent [`PortfolioStateCache::refresh`] calls share one in-flight
//! read.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard},
};

use etherveil_types::{
    AssetId, Identity, PortfolioSnapshot, Result, SessionId, SessionState, VaultError,
};
use futures::{
    FutureExt,
    future::{BoxFuture, Shared, try_join_all},
};
use tokio::sync::watch;

use crate::VaultNode;

/// What [`PortfolioStateCache::get`] returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedPortfolio {
    Absent,
    Stale(Arc<PortfolioSnapshot>),
    Fresh(Arc<PortfolioSnapshot>),
}

impl CachedPortfolio {
    #[must_use]
    pub fn snapshot(&self) -> Option<&Arc<PortfolioSnapshot>> {
        match self {
            Self::Absent => None,
            Self::Stale(s) | Self::Fresh(s) => Some(s),
        }
    }

    #[must_use]
    pub fn is_fresh(&self) -> bool {
        matches!(self, Self::Fresh(_))
    }
}

type SharedRead = Shared<BoxFuture<'static, Result<Arc<PortfolioSnapshot>>>>;

/// Cheap to clone; clones share the same slot.
#[derive(Clone)]
pub struct PortfolioStateCache {
    inner: Arc<CacheInner>,
}

struct CacheInner {
    node: Arc<dyn VaultNode>,
    identity: watch::Receiver<SessionState>,
    /// Assets whose per-asset balance is part of a snapshot.
    assets: Vec<AssetId>,
    slot: Mutex<Slot>,
}

#[derive(Default)]
struct Slot {
    snapshot: Option<Arc<PortfolioSnapshot>>,
    /// Ticket of the read that produced `snapshot`.
    installed: u64,
    stale: bool,
    /// Bumped on every invalidation.
    generation: u64,
    in_flight: Option<InFlight>,
    reads: u64,
    invalidations: u64,
}

/// A running read and the wallet session it reads for.
struct InFlight {
    ticket: u64,
    session: SessionId,
    read: SharedRead,
}

impl PortfolioStateCache {
    #[must_use]
    pub fn new(
        node: Arc<dyn VaultNode>,
        identity: watch::Receiver<SessionState>,
        assets: Vec<AssetId>,
    ) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                node,
                identity,
                assets,
                slot: Mutex::new(Slot::default()),
            }),
        }
    }

    /// Current view, without touching the node.
    #[must_use]
    pub fn get(&self) -> CachedPortfolio {
        let Ok(slot) = self.inner.lock() else {
            return CachedPortfolio::Absent;
        };
        let Some(snapshot) = &slot.snapshot else {
            return CachedPortfolio::Absent;
        };
        let current = self.inner.identity.borrow().session();
        if slot.stale || current != Some(snapshot.session) {
            CachedPortfolio::Stale(Arc::clone(snapshot))
        } else {
            CachedPortfolio::Fresh(Arc::clone(snapshot))
        }
    }

    /// Read a new snapshot for the connected identity.
    ///
    /// Joins the read already in flight when it was started for the same
    /// wallet session; a read left over from a previous session is never
    /// shared with the current one. On failure the previous snapshot is kept
    /// as it was.
    ///
    /// # Errors
    /// - [`VaultError::NotConnected`] if there is no identity
    /// - any node read error
    pub async fn refresh(&self) -> Result<Arc<PortfolioSnapshot>> {
        let read = {
            let mut slot = self.inner.lock()?;
            let identity = self
                .inner
                .identity
                .borrow()
                .identity()
                .cloned()
                .ok_or(VaultError::NotConnected)?;
            let joinable = slot
                .in_flight
                .as_ref()
                .filter(|running| running.session == identity.session)
                .map(|running| running.read.clone());
            if let Some(read) = joinable {
                tracing::trace!("Joining in-flight portfolio read");
                read
            } else {
                slot.reads += 1;
                let ticket = slot.reads;
                let started_at = slot.generation;
                let session = identity.session;
                let inner = Arc::clone(&self.inner);
                let read = async move {
                    let result = inner.read(&identity).await;
                    inner.land(ticket, started_at, result)
                }
                .boxed()
                .shared();
                slot.in_flight = Some(InFlight {
                    ticket,
                    session,
                    read: read.clone(),
                });
                read
            }
        };
        read.await
    }

    /// Mark the held snapshot stale and poison any read in flight.
    pub fn invalidate(&self) {
        if let Ok(mut slot) = self.inner.lock() {
            slot.generation += 1;
            slot.invalidations += 1;
            if slot.snapshot.is_some() {
                slot.stale = true;
            }
            tracing::debug!(generation = slot.generation, "Portfolio cache invalidated");
        }
    }

    /// Node reads started (joined refreshes not counted).
    #[must_use]
    pub fn read_count(&self) -> u64 {
        self.inner.lock().map(|s| s.reads).unwrap_or_default()
    }

    #[must_use]
    pub fn invalidation_count(&self) -> u64 {
        self.inner.lock().map(|s| s.invalidations).unwrap_or_default()
    }
}

impl CacheInner {
    fn lock(&self) -> Result<MutexGuard<'_, Slot>> {
        self.slot
            .lock()
            .map_err(|_| VaultError::Internal("portfolio cache lock poisoned".into()))
    }

    async fn read(&self, identity: &Identity) -> Result<PortfolioSnapshot> {
        let owner = identity.address;
        let node = self.node.as_ref();
        let balances = try_join_all(self.assets.iter().map(|&asset| async move {
            node.get_user_asset_balance(owner, asset)
                .await
                .map(|balance| (asset, balance))
        }));
        let (info, user_balance, balances) = futures::try_join!(
            node.get_portfolio_info(owner),
            node.get_user_balance(owner),
            balances
        )?;
        Ok(PortfolioSnapshot::from_reads(
            info,
            user_balance,
            balances.into_iter().collect::<BTreeMap<_, _>>(),
            identity.session,
        ))
    }

    /// Install the outcome of read `ticket`, started at generation
    /// `started_at`.
    ///
    /// The snapshot is handed back to the read's own waiters in every case,
    /// but only stored if it belongs to the current session and no later
    /// read has been stored already.
    fn land(
        &self,
        ticket: u64,
        started_at: u64,
        result: Result<PortfolioSnapshot>,
    ) -> Result<Arc<PortfolioSnapshot>> {
        let mut slot = self.lock()?;
        if slot.in_flight.as_ref().is_some_and(|r| r.ticket == ticket) {
            slot.in_flight = None;
        }
        match result {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                let current = self.identity.borrow().session();
                if current != Some(snapshot.session) || ticket < slot.installed {
                    tracing::debug!(
                        owner = %snapshot.owner.short(),
                        "Discarding portfolio read from a superseded session"
                    );
                    return Ok(snapshot);
                }
                slot.installed = ticket;
                slot.stale = slot.generation != started_at;
                slot.snapshot = Some(Arc::clone(&snapshot));
                tracing::debug!(
                    owner = %snapshot.owner.short(),
                    stale = slot.stale,
                    "Portfolio snapshot stored"
                );
                Ok(snapshot)
            }
            Err(err) => {
                tracing::warn!(error = %err, "Portfolio read failed");
                Err(err)
            }
        }
    }
}
