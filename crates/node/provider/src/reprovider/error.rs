use crate::{ConfigError, LedgerError};
use tessera_blockstore::StoreError;
use tessera_sorted::SortedError;
use thiserror::Error;
use tokio::task::JoinError;

/// Errors that end a [`Reprovider`](crate::Reprovider) run.
///
/// Failed announcements never show up here: they are retried, logged and skipped.
#[derive(Debug, Error)]
pub enum ReproviderError {
    /// The configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The block store failed while being enumerated.
    #[error("Block store failure: {0}")]
    Store(#[from] StoreError),

    /// The provide ledger failed.
    #[error("Ledger failure: {0}")]
    Ledger(#[from] LedgerError),

    /// The sweep pipeline could not be assembled.
    #[error(transparent)]
    Sorted(#[from] SortedError),

    /// A worker task panicked or was aborted.
    #[error("Worker task failed: {0}")]
    Worker(#[from] JoinError),

    /// A worker task returned while the reprovider was still running.
    #[error("Worker task exited unexpectedly")]
    WorkerExited,
}
