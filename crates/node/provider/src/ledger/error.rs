use tessera_blockstore::MissingColumnFamily;
use thiserror::Error;

/// Errors that may occur while reading or updating a provide ledger.
///
/// Any of these is fatal to a reprovider run: a ledger that cannot be trusted cannot tell
/// which blocks still need announcing.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The underlying database failed.
    #[error("Ledger database error")]
    Database(#[from] rocksdb::Error),

    /// A stored entry could not be decoded.
    #[error("Corrupted ledger entry: {0}")]
    Corrupted(String),

    /// A column family the ledger relies on is absent.
    #[error(transparent)]
    MissingColumnFamily(#[from] MissingColumnFamily),

    /// A lock guarding the ledger was poisoned by a panicking writer.
    #[error("Ledger lock poisoned")]
    Poisoned,
}
