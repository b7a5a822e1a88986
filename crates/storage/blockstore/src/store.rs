//! RocksDB-backed [`BlockStore`].

use crate::{
    Block, BlockStore, ContentId, KeySource, KeyStream, StoreError,
    content_id::storage_key,
    models::{self, BLOCK_META_CF, BLOCKS_CF, BlockMeta},
    scan::{MissingColumnFamily, scan_column_family},
};
use bytes::Bytes;
use cid::Cid;
use rocksdb::{ColumnFamily, DB, IteratorMode, Options, WriteBatch};
use std::{
    collections::HashSet,
    path::Path,
    sync::{Arc, Mutex},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace};

/// Default zstd compression level applied to payloads.
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

/// Default number of keys buffered between a scan and its consumer.
pub const DEFAULT_ENUMERATION_BUFFER: usize = 256;

/// Tunables for a [`RocksBlockStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockStoreConfig {
    /// zstd compression level for payloads.
    pub compression_level: i32,
    /// Keys buffered between a key enumeration and its consumer.
    pub enumeration_buffer: usize,
}

impl Default for BlockStoreConfig {
    fn default() -> Self {
        Self {
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            enumeration_buffer: DEFAULT_ENUMERATION_BUFFER,
        }
    }
}

/// Aggregate figures about the blocks held by a [`RocksBlockStore`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockStoreStats {
    /// Number of stored blocks.
    pub blocks: u64,
    /// Sum of the compressed payload sizes.
    pub stored_bytes: u64,
    /// Sum of the original payload sizes.
    pub original_bytes: u64,
}

/// A persistent, compressed, content-addressed block store.
///
/// Payloads and their metadata live in two column families keyed by the encoded multihash,
/// so RocksDB's bytewise key order is the canonical [`ContentId`] order. The database handle
/// is shared by every reader; writers serialize on a lock so that insert-if-absent and batch
/// writes are atomic as a unit.
#[derive(Debug)]
pub struct RocksBlockStore {
    db: Arc<DB>,
    config: BlockStoreConfig,
    write_lock: Mutex<()>,
}

impl RocksBlockStore {
    /// Creates or opens a block store at the given path.
    pub fn open(path: impl AsRef<Path>, config: BlockStoreConfig) -> Result<Self, StoreError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let db = DB::open_cf(&opts, path.as_ref(), [BLOCKS_CF, BLOCK_META_CF]).inspect_err(
            |err| {
                error!(
                    target: "blockstore",
                    path = %path.as_ref().display(),
                    %err,
                    "Failed to open block store"
                );
            },
        )?;

        debug!(target: "blockstore", path = %path.as_ref().display(), "Opened block store");
        Ok(Self { db: Arc::new(db), config, write_lock: Mutex::new(()) })
    }

    /// Returns the store's configuration.
    pub const fn config(&self) -> &BlockStoreConfig {
        &self.config
    }

    /// Computes [`BlockStoreStats`] by scanning the metadata column family.
    pub fn stats(&self) -> Result<BlockStoreStats, StoreError> {
        let meta_cf = self.cf(BLOCK_META_CF)?;
        let mut stats = BlockStoreStats::default();
        for entry in self.db.iterator_cf(meta_cf, IteratorMode::Start) {
            let (_, value) = entry?;
            let meta = BlockMeta::decode(&value)?;
            stats.blocks += 1;
            stats.stored_bytes += meta.stored_size;
            stats.original_bytes += meta.original_size;
        }
        Ok(stats)
    }

    fn cf(&self, name: &'static str) -> Result<&ColumnFamily, StoreError> {
        self.db.cf_handle(name).ok_or(StoreError::MissingColumnFamily(MissingColumnFamily(name)))
    }

    fn meta(&self, cid: &Cid) -> Result<Option<BlockMeta>, StoreError> {
        let meta_cf = self.cf(BLOCK_META_CF)?;
        self.db
            .get_pinned_cf(meta_cf, storage_key(cid))?
            .map(|value| BlockMeta::decode(&value))
            .transpose()
    }
}

impl KeySource for RocksBlockStore {
    type Error = StoreError;

    fn all_keys(&self, cancel: CancellationToken) -> KeyStream<StoreError> {
        scan_column_family(
            Arc::clone(&self.db),
            BLOCK_META_CF,
            self.config.enumeration_buffer,
            cancel,
            |_, value| BlockMeta::decode(value).map(|meta| Some(ContentId::from(meta.cid))),
        )
    }
}

impl BlockStore for RocksBlockStore {
    fn put(&self, block: &Block) -> Result<(), StoreError> {
        self.put_many(std::slice::from_ref(block))
    }

    fn put_many(&self, blocks: &[Block]) -> Result<(), StoreError> {
        let (data_cf, meta_cf) = (self.cf(BLOCKS_CF)?, self.cf(BLOCK_META_CF)?);
        let _guard = self.write_lock.lock().map_err(|_| StoreError::Poisoned)?;

        let mut batch = WriteBatch::default();
        let mut staged = HashSet::with_capacity(blocks.len());
        let mut staged_bytes = 0u64;
        for block in blocks {
            let key = storage_key(block.cid());
            if staged.contains(&key) || self.db.get_pinned_cf(meta_cf, &key)?.is_some() {
                trace!(target: "blockstore", cid = %block.cid(), "Block already stored, skipping");
                continue;
            }

            let compressed = models::compress(block.data(), self.config.compression_level)?;
            let meta = BlockMeta {
                cid: *block.cid(),
                original_size: block.data().len() as u64,
                stored_size: compressed.len() as u64,
            };
            batch.put_cf(data_cf, &key, compressed);
            batch.put_cf(meta_cf, &key, meta.encode());
            staged_bytes += meta.original_size;
            staged.insert(key);
        }

        if staged.is_empty() {
            return Ok(());
        }

        self.db.write(batch).inspect_err(|err| {
            error!(
                target: "blockstore",
                blocks = staged.len(),
                %err,
                "Failed to write block batch"
            );
        })?;

        #[cfg(feature = "metrics")]
        {
            metrics::counter!(crate::Metrics::BLOCKS_WRITTEN_TOTAL).increment(staged.len() as u64);
            metrics::counter!(crate::Metrics::BYTES_WRITTEN_TOTAL).increment(staged_bytes);
        }
        debug!(
            target: "blockstore",
            requested = blocks.len(),
            written = staged.len(),
            bytes = staged_bytes,
            "Stored blocks"
        );
        Ok(())
    }

    fn get(&self, cid: &Cid) -> Result<Bytes, StoreError> {
        let data_cf = self.cf(BLOCKS_CF)?;
        let Some(compressed) = self.db.get_pinned_cf(data_cf, storage_key(cid))? else {
            tessera_macros::inc!(counter, crate::Metrics::LOOKUP_MISSES_TOTAL);
            return Err(StoreError::NotFound(*cid));
        };
        Ok(models::decompress(&compressed)?.into())
    }

    fn has(&self, cid: &Cid) -> Result<bool, StoreError> {
        let meta_cf = self.cf(BLOCK_META_CF)?;
        Ok(self.db.get_pinned_cf(meta_cf, storage_key(cid))?.is_some())
    }

    fn get_size(&self, cid: &Cid) -> Result<u64, StoreError> {
        match self.meta(cid)? {
            Some(meta) => Ok(meta.original_size),
            None => {
                tessera_macros::inc!(counter, crate::Metrics::LOOKUP_MISSES_TOTAL);
                Err(StoreError::NotFound(*cid))
            }
        }
    }

    fn delete(&self, cid: &Cid) -> Result<(), StoreError> {
        let (data_cf, meta_cf) = (self.cf(BLOCKS_CF)?, self.cf(BLOCK_META_CF)?);
        let key = storage_key(cid);
        let _guard = self.write_lock.lock().map_err(|_| StoreError::Poisoned)?;

        if self.db.get_pinned_cf(meta_cf, &key)?.is_none() {
            return Ok(());
        }

        let mut batch = WriteBatch::default();
        batch.delete_cf(data_cf, &key);
        batch.delete_cf(meta_cf, &key);
        self.db.write(batch)?;

        tessera_macros::inc!(counter, crate::Metrics::BLOCKS_DELETED_TOTAL);
        debug!(target: "blockstore", %cid, "Deleted block");
        Ok(())
    }
}
