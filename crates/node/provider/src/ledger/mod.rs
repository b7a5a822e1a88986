//! Records of which blocks were announced and until when.

use cid::Cid;
use std::time::Duration;
use tessera_blockstore::{KeySource, KeyStream};
use tokio_util::sync::CancellationToken;

mod error;
pub use error::LedgerError;

mod memory;
pub use memory::MemoryLedger;

mod rocks;
pub use rocks::{PROVIDED_CF, RocksLedger};

/// Provides an interface for the provide ledger: per identifier, the time until which its
/// last announcement is considered fresh.
///
/// The ledger's [`KeySource`] enumerates only the *fresh* entries, in the same canonical order
/// the block store uses, so it can serve as the subset side of a diff against the store.
/// Entries are keyed by multihash, matching the block store.
pub trait ProvideLedger: KeySource<Error = LedgerError> {
    /// Enumerates the identifiers whose freshness has not lapsed, in ascending canonical order.
    fn fresh_keys(&self, cancel: CancellationToken) -> KeyStream<LedgerError> {
        self.all_keys(cancel)
    }

    /// Records that `cid` was announced and stays fresh for `ttl` from now.
    ///
    /// Repeated calls overwrite each other; the last one wins.
    fn mark_fresh(&self, cid: &Cid, ttl: Duration) -> Result<(), LedgerError>;

    /// Returns whether `cid` is currently fresh.
    fn is_fresh(&self, cid: &Cid) -> Result<bool, LedgerError>;

    /// Removes lapsed entries, returning how many were removed.
    ///
    /// A lapsed entry is already equivalent to an absent one, so this only reclaims space.
    fn purge_expired(&self) -> Result<usize, LedgerError>;
}
