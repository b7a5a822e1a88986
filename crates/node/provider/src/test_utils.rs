//! Test doubles shared by the reprovider tests.

use crate::{LedgerError, ManualClock, MemoryLedger, ProvideLedger, RoutingClient, RoutingError};
use async_trait::async_trait;
use cid::Cid;
use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex, mpsc},
    time::Duration,
};
use tempfile::TempDir;
use tessera_blockstore::{
    Block, BlockStore, BlockStoreConfig, KeySource, KeyStream, RAW_CODEC, RocksBlockStore,
};
use tokio::{sync::Notify, time::Instant};
use tokio_util::sync::CancellationToken;

/// A routing client whose behavior is scripted per test.
#[derive(Debug, Default)]
pub(crate) struct ScriptedRouter {
    state: Mutex<RouterState>,
    /// Notified when a hanging router receives its first announcement.
    pub(crate) started: Notify,
}

#[derive(Debug, Default)]
struct RouterState {
    attempts: HashMap<Cid, usize>,
    announced: Vec<Cid>,
    transient_failures: usize,
    rejected: HashSet<Cid>,
    hang: bool,
}

impl ScriptedRouter {
    /// Fails the first `n` attempts for every identifier with a timeout.
    pub(crate) fn failing_first(n: usize) -> Self {
        let router = Self::default();
        router.state.lock().unwrap().transient_failures = n;
        router
    }

    /// Rejects every attempt for `cids`.
    pub(crate) fn rejecting(cids: impl IntoIterator<Item = Cid>) -> Self {
        let router = Self::default();
        router.state.lock().unwrap().rejected.extend(cids);
        router
    }

    /// Never completes an announcement.
    pub(crate) fn hanging() -> Self {
        let router = Self::default();
        router.state.lock().unwrap().hang = true;
        router
    }

    /// Returns every identifier announced so far, in announcement order.
    pub(crate) fn announced(&self) -> Vec<Cid> {
        self.state.lock().unwrap().announced.clone()
    }

    /// Returns how many times `cid` was attempted.
    pub(crate) fn attempts(&self, cid: &Cid) -> usize {
        self.state.lock().unwrap().attempts.get(cid).copied().unwrap_or_default()
    }
}

#[async_trait]
impl RoutingClient for ScriptedRouter {
    async fn provide(
        &self,
        cid: &Cid,
        _broadcast: bool,
        _deadline: Instant,
    ) -> Result<(), RoutingError> {
        {
            let mut state = self.state.lock().unwrap();
            let attempts = state.attempts.entry(*cid).or_default();
            *attempts += 1;
            let attempt = *attempts;

            if !state.hang {
                if state.rejected.contains(cid) {
                    return Err(RoutingError::Rejected("scripted".to_string()));
                }
                if attempt <= state.transient_failures {
                    return Err(RoutingError::Timeout);
                }
                state.announced.push(*cid);
                return Ok(());
            }
        }

        self.started.notify_one();
        std::future::pending().await
    }
}

/// A ledger whose writes always fail.
#[derive(Debug)]
pub(crate) struct BrokenLedger {
    inner: MemoryLedger<ManualClock>,
}

impl BrokenLedger {
    pub(crate) fn new() -> Self {
        Self { inner: MemoryLedger::with_clock(ManualClock::default()) }
    }
}

impl KeySource for BrokenLedger {
    type Error = LedgerError;

    fn all_keys(&self, cancel: CancellationToken) -> KeyStream<LedgerError> {
        self.inner.all_keys(cancel)
    }
}

impl ProvideLedger for BrokenLedger {
    fn mark_fresh(&self, _cid: &Cid, _ttl: Duration) -> Result<(), LedgerError> {
        Err(LedgerError::Corrupted("ledger is read-only".to_string()))
    }

    fn is_fresh(&self, cid: &Cid) -> Result<bool, LedgerError> {
        self.inner.is_fresh(cid)
    }

    fn purge_expired(&self) -> Result<usize, LedgerError> {
        self.inner.purge_expired()
    }
}

/// A ledger whose freshness checks block until [`StalledLedger::release`] is called.
#[derive(Debug)]
pub(crate) struct StalledLedger {
    inner: MemoryLedger<ManualClock>,
    gate: Mutex<mpsc::Receiver<()>>,
    release: Mutex<Option<mpsc::Sender<()>>>,
    /// Notified each time a freshness check starts to block.
    pub(crate) stalled: Notify,
}

impl StalledLedger {
    pub(crate) fn new() -> Self {
        let (release, gate) = mpsc::channel();
        Self {
            inner: MemoryLedger::with_clock(ManualClock::default()),
            gate: Mutex::new(gate),
            release: Mutex::new(Some(release)),
            stalled: Notify::new(),
        }
    }

    /// Unblocks every pending and future freshness check.
    pub(crate) fn release(&self) {
        self.release.lock().unwrap().take();
    }
}

impl KeySource for StalledLedger {
    type Error = LedgerError;

    fn all_keys(&self, cancel: CancellationToken) -> KeyStream<LedgerError> {
        self.inner.all_keys(cancel)
    }
}

impl ProvideLedger for StalledLedger {
    fn mark_fresh(&self, cid: &Cid, ttl: Duration) -> Result<(), LedgerError> {
        self.inner.mark_fresh(cid, ttl)
    }

    fn is_fresh(&self, cid: &Cid) -> Result<bool, LedgerError> {
        self.stalled.notify_one();
        // Bounded so a failing test cannot leak a blocking thread forever.
        let _ = self.gate.lock().unwrap().recv_timeout(Duration::from_secs(30));
        self.inner.is_fresh(cid)
    }

    fn purge_expired(&self) -> Result<usize, LedgerError> {
        self.inner.purge_expired()
    }
}

/// Returns distinct raw blocks, one per index in `range`.
pub(crate) fn blocks(prefix: &str, range: std::ops::Range<usize>) -> Vec<Block> {
    range.map(|i| Block::new(RAW_CODEC, format!("{prefix}-{i}").into_bytes())).collect()
}

/// Opens a block store in a fresh temporary directory holding `blocks`.
pub(crate) fn block_store(blocks: &[Block]) -> (TempDir, Arc<RocksBlockStore>) {
    let tmp_dir = TempDir::new().unwrap();
    let store = RocksBlockStore::open(tmp_dir.path(), BlockStoreConfig::default()).unwrap();
    store.put_many(blocks).unwrap();
    (tmp_dir, Arc::new(store))
}
