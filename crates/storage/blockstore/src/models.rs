//! On-disk record layouts.
//!
//! A block is persisted as two rows sharing the same key, the encoded multihash:
//! - **`blocks`**: the zstd-compressed payload.
//! - **`block_meta`**: a [`BlockMeta`] record (original size, stored size, full CID).
//!
//! Splitting metadata from payloads lets existence checks, size lookups and key enumeration
//! run without touching payload bytes.

use crate::StoreError;
use cid::Cid;
use std::io;
use unsigned_varint::{decode, encode};

/// Column family holding compressed payloads.
pub const BLOCKS_CF: &str = "blocks";

/// Column family holding [`BlockMeta`] records.
pub const BLOCK_META_CF: &str = "block_meta";

/// Metadata stored next to every block payload.
///
/// Layout: `varint(original_size) || varint(stored_size) || cid bytes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockMeta {
    /// The block identifier, including its codec.
    pub cid: Cid,
    /// Payload size before compression.
    pub original_size: u64,
    /// Payload size as stored, after compression.
    pub stored_size: u64,
}

impl BlockMeta {
    /// Encodes the record.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(96);
        buf.extend_from_slice(encode::u64(self.original_size, &mut encode::u64_buffer()));
        buf.extend_from_slice(encode::u64(self.stored_size, &mut encode::u64_buffer()));
        buf.extend_from_slice(&self.cid.to_bytes());
        buf
    }

    /// Decodes a record produced by [`BlockMeta::encode`].
    pub fn decode(bytes: &[u8]) -> Result<Self, StoreError> {
        let (original_size, rest) =
            decode::u64(bytes).map_err(|err| StoreError::Corrupted(err.to_string()))?;
        let (stored_size, rest) =
            decode::u64(rest).map_err(|err| StoreError::Corrupted(err.to_string()))?;
        let cid = Cid::try_from(rest).map_err(|err| StoreError::Corrupted(err.to_string()))?;
        Ok(Self { cid, original_size, stored_size })
    }
}

/// Compresses a payload into a single zstd frame.
pub(crate) fn compress(data: &[u8], level: i32) -> io::Result<Vec<u8>> {
    zstd::stream::encode_all(data, level)
}

/// Decompresses a payload written by [`compress`].
pub(crate) fn decompress(data: &[u8]) -> io::Result<Vec<u8>> {
    zstd::stream::decode_all(data)
}
