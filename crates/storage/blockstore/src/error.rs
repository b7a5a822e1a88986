use crate::scan::MissingColumnFamily;
use cid::Cid;
use thiserror::Error;

/// Errors that may occur while interacting with the block store.
///
/// This enum is used by every implementation of the [`BlockStore`](crate::BlockStore) trait.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No block is stored under the requested multihash.
    #[error("Block not found: {0}")]
    NotFound(Cid),

    /// The underlying database failed.
    #[error("Database error")]
    Database(#[from] rocksdb::Error),

    /// Compressing or decompressing a payload failed.
    #[error("Payload codec error")]
    Codec(#[from] std::io::Error),

    /// A stored record could not be decoded.
    #[error("Corrupted record: {0}")]
    Corrupted(String),

    /// A column family the store relies on is absent.
    #[error(transparent)]
    MissingColumnFamily(#[from] MissingColumnFamily),

    /// The write lock was poisoned by a panicking writer.
    #[error("Write lock poisoned")]
    Poisoned,
}
