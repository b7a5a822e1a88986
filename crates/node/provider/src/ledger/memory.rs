use crate::{
    Clock, LedgerError, ProvideLedger, SystemClock,
    clock::{expiry_millis, unix_millis},
};
use cid::Cid;
use futures::{StreamExt, stream};
use std::{
    collections::BTreeMap,
    sync::{Mutex, MutexGuard},
    time::Duration,
};
use tessera_blockstore::{ContentId, KeySource, KeyStream, storage_key};
use tokio_util::sync::CancellationToken;

/// An in-memory [`ProvideLedger`].
///
/// Nothing survives a restart, so every block is announced again on the first sweep after one.
#[derive(Debug)]
pub struct MemoryLedger<C = SystemClock> {
    /// Expiry in Unix milliseconds and the last identifier marked, keyed by multihash.
    entries: Mutex<BTreeMap<Vec<u8>, (u64, Cid)>>,
    clock: C,
}

impl MemoryLedger {
    /// Creates an empty ledger reading the system clock.
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> MemoryLedger<C> {
    /// Creates an empty ledger reading `clock`.
    pub fn with_clock(clock: C) -> Self {
        Self { entries: Mutex::new(BTreeMap::new()), clock }
    }

    /// Returns the number of entries, lapsed or not.
    pub fn len(&self) -> Result<usize, LedgerError> {
        Ok(self.entries()?.len())
    }

    /// Returns whether the ledger holds no entries.
    pub fn is_empty(&self) -> Result<bool, LedgerError> {
        Ok(self.entries()?.is_empty())
    }

    fn entries(&self) -> Result<MutexGuard<'_, BTreeMap<Vec<u8>, (u64, Cid)>>, LedgerError> {
        self.entries.lock().map_err(|_| LedgerError::Poisoned)
    }
}

impl<C: Clock> KeySource for MemoryLedger<C> {
    type Error = LedgerError;

    fn all_keys(&self, cancel: CancellationToken) -> KeyStream<LedgerError> {
        let now = unix_millis(self.clock.now());
        let fresh: Vec<Result<ContentId, LedgerError>> = match self.entries() {
            Ok(entries) => entries
                .values()
                .filter(|(expiry, _)| *expiry > now)
                .map(|(_, cid)| Ok(ContentId::from(*cid)))
                .collect(),
            Err(err) => vec![Err(err)],
        };
        stream::iter(fresh).take_until(cancel.cancelled_owned()).boxed()
    }
}

impl<C: Clock> ProvideLedger for MemoryLedger<C> {
    fn mark_fresh(&self, cid: &Cid, ttl: Duration) -> Result<(), LedgerError> {
        let expiry = expiry_millis(self.clock.now(), ttl);
        self.entries()?.insert(storage_key(cid), (expiry, *cid));
        Ok(())
    }

    fn is_fresh(&self, cid: &Cid) -> Result<bool, LedgerError> {
        let now = unix_millis(self.clock.now());
        Ok(self.entries()?.get(&storage_key(cid)).is_some_and(|(expiry, _)| *expiry > now))
    }

    fn purge_expired(&self) -> Result<usize, LedgerError> {
        let now = unix_millis(self.clock.now());
        let mut entries = self.entries()?;
        let before = entries.len();
        entries.retain(|_, (expiry, _)| *expiry > now);
        Ok(before - entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ManualClock;
    use futures::TryStreamExt;
    use tessera_blockstore::{Block, RAW_CODEC};

    fn cid(seed: u32) -> Cid {
        *Block::new(RAW_CODEC, seed.to_le_bytes().to_vec()).cid()
    }

    #[test]
    fn test_freshness_lapses_with_the_clock() {
        let clock = ManualClock::default();
        let ledger = MemoryLedger::with_clock(clock.clone());
        let id = cid(1);

        assert!(!ledger.is_fresh(&id).unwrap());
        ledger.mark_fresh(&id, Duration::from_secs(60)).unwrap();
        assert!(ledger.is_fresh(&id).unwrap());

        clock.advance(Duration::from_secs(60));
        assert!(!ledger.is_fresh(&id).unwrap());
    }

    #[test]
    fn test_last_mark_wins() {
        let clock = ManualClock::default();
        let ledger = MemoryLedger::with_clock(clock.clone());
        let id = cid(2);

        ledger.mark_fresh(&id, Duration::from_secs(3600)).unwrap();
        ledger.mark_fresh(&id, Duration::from_secs(10)).unwrap();
        clock.advance(Duration::from_secs(11));

        assert!(!ledger.is_fresh(&id).unwrap());
        assert_eq!(ledger.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_fresh_keys_are_sorted_and_skip_lapsed_entries() {
        let clock = ManualClock::default();
        let ledger = MemoryLedger::with_clock(clock.clone());
        let ids: Vec<Cid> = (0..20).map(cid).collect();
        for (i, id) in ids.iter().enumerate() {
            let ttl = if i % 2 == 0 { Duration::from_secs(10) } else { Duration::from_secs(100) };
            ledger.mark_fresh(id, ttl).unwrap();
        }
        clock.advance(Duration::from_secs(50));

        let fresh: Vec<ContentId> =
            ledger.fresh_keys(CancellationToken::new()).try_collect().await.unwrap();

        let mut expected: Vec<ContentId> =
            ids.iter().skip(1).step_by(2).copied().map(ContentId::from).collect();
        expected.sort();
        assert_eq!(fresh, expected);
    }

    #[test]
    fn test_purge_expired() {
        let clock = ManualClock::default();
        let ledger = MemoryLedger::with_clock(clock.clone());
        ledger.mark_fresh(&cid(1), Duration::from_secs(5)).unwrap();
        ledger.mark_fresh(&cid(2), Duration::from_secs(500)).unwrap();
        clock.advance(Duration::from_secs(6));

        assert_eq!(ledger.purge_expired().unwrap(), 1);
        assert_eq!(ledger.len().unwrap(), 1);
        assert!(ledger.is_fresh(&cid(2)).unwrap());
    }
}
