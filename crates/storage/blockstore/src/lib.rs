//! # tessera-blockstore
//!
//! Persistent, compressed, content-addressed block storage for tessera nodes.
//!
//! ## Overview
//!
//! Blocks are immutable `(Cid, payload)` pairs. The store keys every block by the encoded
//! multihash of its [`Cid`](cid::Cid), compresses payloads with zstd and keeps a small
//! metadata record next to each payload so that existence checks, size lookups and key
//! enumeration never decompress anything.
//!
//! - [`RocksBlockStore`]: the RocksDB-backed [`BlockStore`].
//! - [`ContentId`]: a [`Cid`](cid::Cid) under the canonical key order shared by every
//!   [`KeySource`].
//! - [`scan_column_family`]: a cancellable, back-pressured key scan reused by other RocksDB
//!   backed key sources.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use futures::TryStreamExt;
//! use tessera_blockstore::{
//!     Block, BlockStore, BlockStoreConfig, KeySource, RAW_CODEC, RocksBlockStore,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = RocksBlockStore::open("/tmp/tessera-blocks", BlockStoreConfig::default())?;
//! let block = Block::new(RAW_CODEC, b"hello".to_vec());
//! store.put(&block)?;
//!
//! let keys: Vec<_> = store.all_keys(CancellationToken::new()).try_collect().await?;
//! assert_eq!(keys.len(), 1);
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

mod block;
pub use block::{Block, DAG_CBOR_CODEC, RAW_CODEC};

mod content_id;
pub use content_id::{ContentId, storage_key};

mod error;
pub use error::StoreError;

mod traits;
pub use traits::{BlockStore, KeySource, KeyStream};

mod models;
pub use models::{BLOCK_META_CF, BLOCKS_CF, BlockMeta};

mod scan;
pub use scan::{MissingColumnFamily, scan_column_family};

mod store;
pub use store::{
    BlockStoreConfig, BlockStoreStats, DEFAULT_COMPRESSION_LEVEL, DEFAULT_ENUMERATION_BUFFER,
    RocksBlockStore,
};

/// Metrics for the block store.
mod metrics;
pub use metrics::Metrics;
