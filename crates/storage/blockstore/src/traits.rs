use crate::{Block, ContentId, StoreError};
use bytes::Bytes;
use cid::Cid;
use futures::stream::BoxStream;
use std::fmt::Debug;
use tokio_util::sync::CancellationToken;

/// An ascending stream of [`ContentId`]s.
///
/// The first error ends the stream: an enumeration that fails midway yields the error as its
/// last item instead of silently stopping short.
pub type KeyStream<E> = BoxStream<'static, Result<ContentId, E>>;

/// A source of identifiers enumerated in canonical [`ContentId`] order.
pub trait KeySource: Debug + Send + Sync {
    /// The error yielded when enumeration fails.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Enumerates every key of the source in ascending canonical order.
    ///
    /// Each call starts a fresh enumeration. The producer stops promptly once `cancel` fires or
    /// the returned stream is dropped, releasing any storage cursor it holds.
    fn all_keys(&self, cancel: CancellationToken) -> KeyStream<Self::Error>;
}

/// Provides an interface for persistent, content-addressed block storage.
///
/// Blocks are keyed by the multihash of their [`Cid`], so two identifiers sharing a multihash
/// address the same record. Records are immutable: writing an existing key is a no-op.
///
/// Implementations are expected to provide persistent and thread-safe access to block data.
pub trait BlockStore: KeySource<Error = StoreError> {
    /// Stores a block. Storing a block whose multihash is already present succeeds without
    /// touching the existing record.
    fn put(&self, block: &Block) -> Result<(), StoreError>;

    /// Stores a set of blocks atomically: either every new block persists or none does.
    fn put_many(&self, blocks: &[Block]) -> Result<(), StoreError>;

    /// Returns the original payload of a block.
    ///
    /// # Returns
    /// * `Ok(Bytes)` with the decompressed payload, which may be empty.
    /// * `Err(StoreError::NotFound)` if no block matches the identifier's multihash.
    fn get(&self, cid: &Cid) -> Result<Bytes, StoreError>;

    /// Returns whether a block is stored, without reading its payload.
    fn has(&self, cid: &Cid) -> Result<bool, StoreError>;

    /// Returns the original (uncompressed) payload size without decompressing it.
    ///
    /// # Returns
    /// * `Ok(u64)` with the size in bytes.
    /// * `Err(StoreError::NotFound)` if no block matches the identifier's multihash.
    fn get_size(&self, cid: &Cid) -> Result<u64, StoreError>;

    /// Removes a block. Removing an absent block succeeds.
    fn delete(&self, cid: &Cid) -> Result<(), StoreError>;
}
