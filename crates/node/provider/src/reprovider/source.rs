use crate::ReproviderError;
use futures::{StreamExt, TryStreamExt};
use std::fmt::Debug;
use tessera_blockstore::{KeySource, KeyStream};
use tokio_util::sync::CancellationToken;

/// A set of identifiers the node should keep announced.
///
/// Implemented for every [`KeySource`] whose error converts into a [`ReproviderError`], which
/// covers block stores and ledgers.
pub trait ProvideSource: Debug + Send + Sync {
    /// Enumerates the identifiers in ascending canonical order.
    fn provide_keys(&self, cancel: CancellationToken) -> KeyStream<ReproviderError>;
}

impl<S> ProvideSource for S
where
    S: KeySource,
    ReproviderError: From<S::Error>,
{
    fn provide_keys(&self, cancel: CancellationToken) -> KeyStream<ReproviderError> {
        self.all_keys(cancel).map_err(ReproviderError::from).boxed()
    }
}
