use crate::{
    Clock, LedgerError, ProvideLedger, SystemClock,
    clock::{expiry_millis, unix_millis},
};
use cid::Cid;
use rocksdb::{ColumnFamily, DB, IteratorMode, Options, WriteBatch};
use std::{
    path::Path,
    sync::{Arc, Mutex},
    time::Duration,
};
use tessera_blockstore::{
    ContentId, KeySource, KeyStream, MissingColumnFamily, scan_column_family, storage_key,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// Column family holding ledger entries.
pub const PROVIDED_CF: &str = "provided";

/// Keys buffered between a fresh-key scan and its consumer.
const SCAN_BUFFER: usize = 256;

/// Size of the big-endian expiry prefix of an entry.
const EXPIRY_LEN: usize = 8;

/// A RocksDB-backed [`ProvideLedger`].
///
/// Entries are keyed by the encoded multihash, like the block store, and hold the expiry in
/// Unix milliseconds (big-endian) followed by the encoded CID. The ledger lives in its own
/// database: it is never written in the same transaction as the block store.
#[derive(Debug)]
pub struct RocksLedger<C = SystemClock> {
    db: Arc<DB>,
    clock: C,
    write_lock: Mutex<()>,
}

impl RocksLedger {
    /// Creates or opens a ledger at `path` reading the system clock.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        Self::open_with_clock(path, SystemClock)
    }
}

impl<C: Clock> RocksLedger<C> {
    /// Creates or opens a ledger at `path` reading `clock`.
    pub fn open_with_clock(path: impl AsRef<Path>, clock: C) -> Result<Self, LedgerError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let db = DB::open_cf(&opts, path.as_ref(), [PROVIDED_CF]).inspect_err(|err| {
            error!(
                target: "ledger",
                path = %path.as_ref().display(),
                %err,
                "Failed to open provide ledger"
            );
        })?;

        debug!(target: "ledger", path = %path.as_ref().display(), "Opened provide ledger");
        Ok(Self { db: Arc::new(db), clock, write_lock: Mutex::new(()) })
    }

    fn cf(&self) -> Result<&ColumnFamily, LedgerError> {
        self.db.cf_handle(PROVIDED_CF).ok_or(LedgerError::MissingColumnFamily(MissingColumnFamily(
            PROVIDED_CF,
        )))
    }
}

fn encode_entry(expiry: u64, cid: &Cid) -> Vec<u8> {
    let mut value = expiry.to_be_bytes().to_vec();
    value.extend_from_slice(&cid.to_bytes());
    value
}

fn decode_expiry(value: &[u8]) -> Result<u64, LedgerError> {
    let prefix: [u8; EXPIRY_LEN] = value
        .get(..EXPIRY_LEN)
        .and_then(|prefix| prefix.try_into().ok())
        .ok_or_else(|| LedgerError::Corrupted(format!("entry of {} bytes", value.len())))?;
    Ok(u64::from_be_bytes(prefix))
}

fn decode_cid(value: &[u8]) -> Result<Cid, LedgerError> {
    Cid::try_from(&value[EXPIRY_LEN.min(value.len())..])
        .map_err(|err| LedgerError::Corrupted(err.to_string()))
}

impl<C: Clock> KeySource for RocksLedger<C> {
    type Error = LedgerError;

    fn all_keys(&self, cancel: CancellationToken) -> KeyStream<LedgerError> {
        let now = unix_millis(self.clock.now());
        scan_column_family(Arc::clone(&self.db), PROVIDED_CF, SCAN_BUFFER, cancel, move |_, value| {
            if decode_expiry(value)? <= now {
                return Ok(None);
            }
            Ok(Some(ContentId::from(decode_cid(value)?)))
        })
    }
}

impl<C: Clock> ProvideLedger for RocksLedger<C> {
    fn mark_fresh(&self, cid: &Cid, ttl: Duration) -> Result<(), LedgerError> {
        let cf = self.cf()?;
        let expiry = expiry_millis(self.clock.now(), ttl);
        let _guard = self.write_lock.lock().map_err(|_| LedgerError::Poisoned)?;
        self.db.put_cf(cf, storage_key(cid), encode_entry(expiry, cid))?;
        Ok(())
    }

    fn is_fresh(&self, cid: &Cid) -> Result<bool, LedgerError> {
        let cf = self.cf()?;
        let now = unix_millis(self.clock.now());
        match self.db.get_pinned_cf(cf, storage_key(cid))? {
            Some(value) => Ok(decode_expiry(&value)? > now),
            None => Ok(false),
        }
    }

    fn purge_expired(&self) -> Result<usize, LedgerError> {
        let cf = self.cf()?;
        let now = unix_millis(self.clock.now());
        let _guard = self.write_lock.lock().map_err(|_| LedgerError::Poisoned)?;

        let mut batch = WriteBatch::default();
        for entry in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (key, value) = entry?;
            if decode_expiry(&value)? <= now {
                batch.delete_cf(cf, key);
            }
        }

        let purged = batch.len();
        if purged > 0 {
            self.db.write(batch)?;
            debug!(target: "ledger", purged, "Purged lapsed ledger entries");
        }
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ManualClock;
    use futures::TryStreamExt;
    use tempfile::TempDir;
    use tessera_blockstore::{Block, RAW_CODEC};

    fn cid(seed: u32) -> Cid {
        *Block::new(RAW_CODEC, seed.to_le_bytes().to_vec()).cid()
    }

    fn open_ledger(clock: ManualClock) -> (TempDir, RocksLedger<ManualClock>) {
        let tmp_dir = TempDir::new().expect("create temp dir");
        let ledger = RocksLedger::open_with_clock(tmp_dir.path().join("ledger"), clock)
            .expect("should open ledger");
        (tmp_dir, ledger)
    }

    #[test]
    fn test_entry_layout() {
        let id = cid(7);
        let value = encode_entry(1_234, &id);

        assert_eq!(decode_expiry(&value).unwrap(), 1_234);
        assert_eq!(decode_cid(&value).unwrap(), id);
        assert!(matches!(decode_expiry(&value[..3]), Err(LedgerError::Corrupted(_))));
        assert!(matches!(decode_cid(&value[..EXPIRY_LEN]), Err(LedgerError::Corrupted(_))));
    }

    #[test]
    fn test_mark_and_check_freshness() {
        let clock = ManualClock::default();
        let (_tmp, ledger) = open_ledger(clock.clone());
        let id = cid(1);

        assert!(!ledger.is_fresh(&id).unwrap());
        ledger.mark_fresh(&id, Duration::from_secs(30)).unwrap();
        assert!(ledger.is_fresh(&id).unwrap());

        clock.advance(Duration::from_secs(31));
        assert!(!ledger.is_fresh(&id).unwrap());

        ledger.mark_fresh(&id, Duration::from_secs(30)).unwrap();
        assert!(ledger.is_fresh(&id).unwrap());
    }

    #[test]
    fn test_entries_survive_reopen() {
        let clock = ManualClock::default();
        let tmp_dir = TempDir::new().unwrap();
        let path = tmp_dir.path().join("ledger");
        let id = cid(3);

        {
            let ledger = RocksLedger::open_with_clock(&path, clock.clone()).unwrap();
            ledger.mark_fresh(&id, Duration::from_secs(3600)).unwrap();
        }

        let ledger = RocksLedger::open_with_clock(&path, clock).unwrap();
        assert!(ledger.is_fresh(&id).unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_fresh_keys_match_block_store_order() {
        let clock = ManualClock::default();
        let (_tmp, ledger) = open_ledger(clock.clone());
        let ids: Vec<Cid> = (0..40).map(cid).collect();
        for id in &ids {
            ledger.mark_fresh(id, Duration::from_secs(100)).unwrap();
        }
        ledger.mark_fresh(&ids[0], Duration::from_secs(1)).unwrap();
        clock.advance(Duration::from_secs(2));

        let fresh: Vec<ContentId> =
            ledger.fresh_keys(CancellationToken::new()).try_collect().await.unwrap();

        let mut expected: Vec<ContentId> = ids[1..].iter().copied().map(ContentId::from).collect();
        expected.sort();
        assert_eq!(fresh, expected);
    }

    #[test]
    fn test_purge_expired() {
        let clock = ManualClock::default();
        let (_tmp, ledger) = open_ledger(clock.clone());
        for seed in 0..10 {
            let ttl = Duration::from_secs(if seed < 4 { 5 } else { 500 });
            ledger.mark_fresh(&cid(seed), ttl).unwrap();
        }
        clock.advance(Duration::from_secs(10));

        assert_eq!(ledger.purge_expired().unwrap(), 4);
        assert_eq!(ledger.purge_expired().unwrap(), 0);
        assert!(ledger.is_fresh(&cid(9)).unwrap());
    }
}
