//! # tessera-provider
//!
//! Keeps the blocks a tessera node stores announced on the content-routing DHT.
//!
//! ## Overview
//!
//! Provider records on the DHT expire, so a node has to announce its blocks again and again.
//! The [`Reprovider`] does this in periodic sweeps. Each sweep streams the identifiers of the
//! block store (and of any further [`ProvideSource`]s) in canonical order, removes the ones the
//! [`ProvideLedger`] still considers fresh and hands the rest to a pool of announce workers.
//! Every successful announcement is recorded in the ledger, so a block is announced at most
//! once per `provide_ttl` no matter how often sweeps run.
//!
//! - [`Reprovider`]: the sweep loop and its worker pool, built with a [`ReproviderBuilder`].
//! - [`ProvideLedger`]: freshness records, in memory ([`MemoryLedger`]) or persisted in
//!   RocksDB ([`RocksLedger`]).
//! - [`RoutingClient`]: the announce side, usually a [`QueuedRoutingClient`] talking to the
//!   task that drives the libp2p Kademlia behaviour.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tessera_blockstore::{BlockStoreConfig, RocksBlockStore};
//! use tessera_provider::{
//!     MemoryLedger, QueuedRoutingClient, ReproviderBuilder, ReproviderConfig,
//! };
//! use tokio::sync::{mpsc, watch};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = RocksBlockStore::open("/tmp/tessera-blocks", BlockStoreConfig::default())?;
//! let store = Arc::new(store);
//! let (provide_request_tx, _provide_request_rx) = mpsc::channel(1024);
//! let (_ready_tx, ready_rx) = watch::channel(true);
//!
//! let reprovider = ReproviderBuilder::new()
//!     .with_block_store(store)
//!     .with_ledger(Arc::new(MemoryLedger::new()))
//!     .with_routing_client(Arc::new(QueuedRoutingClient::new(provide_request_tx, ready_rx)))
//!     .with_config(ReproviderConfig::from_toml_str("worker_count = 8")?)
//!     .with_cancellation_token(CancellationToken::new())
//!     .build()?;
//!
//! let mut sweeps = reprovider.subscribe_sweeps();
//! tokio::spawn(reprovider.run());
//! sweeps.changed().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - `metrics`: Enable Prometheus metrics collection (optional)

#![doc(issue_tracker_base_url = "https://github.com/tessera-sync/tessera/issues/")]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod clock;
pub use clock::{Clock, ManualClock, SystemClock};

mod ledger;
pub use ledger::{LedgerError, MemoryLedger, PROVIDED_CF, ProvideLedger, RocksLedger};

mod routing;
pub use routing::{
    ProvideRequest, QueuedRoutingClient, RoutingClient, RoutingError, record_key,
};

mod reprovider;
pub use reprovider::{
    ConfigError, DEFAULT_MAX_ATTEMPTS, DEFAULT_PROVIDE_TIMEOUT, DEFAULT_PROVIDE_TTL,
    DEFAULT_REPROVIDE_INTERVAL, DEFAULT_WORKER_COUNT, ProvideSource, Reprovider,
    ReproviderBuilder, ReproviderConfig, ReproviderError, SweepSummary,
};

/// Metrics for the reprovider.
mod metrics;
pub use metrics::Metrics;

#[cfg(test)]
mod test_utils;
