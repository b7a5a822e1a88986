//! Builder for [`Reprovider`].

use crate::{
    ConfigError, ProvideLedger, ProvideSource, Reprovider, ReproviderConfig, ReproviderError,
    RoutingClient,
};
use std::sync::Arc;
use tessera_blockstore::BlockStore;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Builder for constructing a [`Reprovider`].
#[derive(Debug)]
pub struct ReproviderBuilder<L, R>
where
    L: ProvideLedger,
    R: RoutingClient,
{
    /// The block store, announced first.
    pub block_store: Option<Arc<dyn ProvideSource>>,
    /// Further identifier sets merged with the block store's.
    pub sources: Vec<Arc<dyn ProvideSource>>,
    /// The ledger recording announcements.
    pub ledger: Option<Arc<L>>,
    /// The client announcing identifiers.
    pub routing_client: Option<Arc<R>>,
    /// The reprovider configuration.
    pub config: ReproviderConfig,
    /// The cancellation token that stops the reprovider.
    pub cancellation_token: Option<CancellationToken>,
}

impl<L, R> Default for ReproviderBuilder<L, R>
where
    L: ProvideLedger,
    R: RoutingClient,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<L, R> ReproviderBuilder<L, R>
where
    L: ProvideLedger,
    R: RoutingClient,
{
    /// Creates a new empty [`ReproviderBuilder`] with the default configuration.
    pub fn new() -> Self {
        Self {
            block_store: None,
            sources: Vec::new(),
            ledger: None,
            routing_client: None,
            config: ReproviderConfig::default(),
            cancellation_token: None,
        }
    }

    /// Sets the block store whose blocks are announced.
    pub fn with_block_store<B: BlockStore + 'static>(mut self, block_store: Arc<B>) -> Self {
        self.block_store = Some(block_store);
        self
    }

    /// Adds another set of identifiers to announce alongside the block store's.
    pub fn with_source<S: ProvideSource + 'static>(mut self, source: Arc<S>) -> Self {
        self.sources.push(source);
        self
    }

    /// Sets the provide ledger.
    pub fn with_ledger(mut self, ledger: Arc<L>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Sets the routing client.
    pub fn with_routing_client(mut self, routing_client: Arc<R>) -> Self {
        self.routing_client = Some(routing_client);
        self
    }

    /// Sets the configuration.
    pub fn with_config(mut self, config: ReproviderConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the cancellation token.
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    /// Builds the [`Reprovider`].
    ///
    /// # Errors
    ///
    /// Fails if the configuration is invalid or if the block store, ledger, routing client or
    /// cancellation token is missing.
    pub fn build(self) -> Result<Reprovider<L, R>, ReproviderError> {
        self.config.validate()?;

        let block_store = self.block_store.ok_or(ConfigError::Missing("block store"))?;
        let mut sources = Vec::with_capacity(self.sources.len() + 1);
        sources.push(block_store);
        sources.extend(self.sources);

        let (sweeps, _) = watch::channel(None);
        Ok(Reprovider {
            sources,
            ledger: self.ledger.ok_or(ConfigError::Missing("ledger"))?,
            router: self.routing_client.ok_or(ConfigError::Missing("routing client"))?,
            config: self.config,
            cancellation: self
                .cancellation_token
                .ok_or(ConfigError::Missing("cancellation token"))?,
            sweeps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryLedger, routing::MockRoutingClient};
    use std::time::Duration;
    use tempfile::TempDir;
    use tessera_blockstore::{BlockStoreConfig, RocksBlockStore};

    type Builder = ReproviderBuilder<MemoryLedger, MockRoutingClient>;

    #[test]
    fn test_build_requires_components() {
        let tmp_dir = TempDir::new().unwrap();
        let store =
            Arc::new(RocksBlockStore::open(tmp_dir.path(), BlockStoreConfig::default()).unwrap());

        let missing_store = Builder::new()
            .with_ledger(Arc::new(MemoryLedger::new()))
            .with_routing_client(Arc::new(MockRoutingClient::new()))
            .with_cancellation_token(CancellationToken::new())
            .build();
        assert!(matches!(
            missing_store,
            Err(ReproviderError::Config(ConfigError::Missing("block store")))
        ));

        let missing_router = Builder::new()
            .with_block_store(Arc::clone(&store))
            .with_ledger(Arc::new(MemoryLedger::new()))
            .with_cancellation_token(CancellationToken::new())
            .build();
        assert!(matches!(
            missing_router,
            Err(ReproviderError::Config(ConfigError::Missing("routing client")))
        ));

        let complete = Builder::new()
            .with_block_store(store)
            .with_source(Arc::new(MemoryLedger::new()))
            .with_ledger(Arc::new(MemoryLedger::new()))
            .with_routing_client(Arc::new(MockRoutingClient::new()))
            .with_cancellation_token(CancellationToken::new())
            .build()
            .unwrap();
        assert_eq!(complete.sources.len(), 2);
    }

    #[test]
    fn test_build_validates_config() {
        let config = ReproviderConfig { provide_ttl: Duration::from_secs(1), ..Default::default() };
        let result = Builder::new().with_config(config).build();
        assert!(matches!(
            result,
            Err(ReproviderError::Config(ConfigError::TtlShorterThanInterval { .. }))
        ));
    }
}
