//! Immutable content-addressed blocks.

use bytes::Bytes;
use cid::Cid;
use multihash_codetable::{Code, MultihashDigest};

/// Multicodec for raw binary payloads.
pub const RAW_CODEC: u64 = 0x55;

/// Multicodec for DAG-CBOR encoded payloads.
pub const DAG_CBOR_CODEC: u64 = 0x71;

/// An immutable `(Cid, payload)` pair.
///
/// The block store trusts the [`Cid`] it is handed and never re-derives it from the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    cid: Cid,
    data: Bytes,
}

impl Block {
    /// Creates a new block, deriving a CIDv1 from the SHA2-256 digest of `data`.
    pub fn new(codec: u64, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        let hash = Code::Sha2_256.digest(&data);
        Self { cid: Cid::new_v1(codec, hash), data }
    }

    /// Creates a block from an already computed [`Cid`] and its payload.
    pub const fn from_parts(cid: Cid, data: Bytes) -> Self {
        Self { cid, data }
    }

    /// Returns the block's [`Cid`].
    pub const fn cid(&self) -> &Cid {
        &self.cid
    }

    /// Returns the block's payload.
    pub const fn data(&self) -> &Bytes {
        &self.data
    }

    /// Consumes the block, returning its [`Cid`] and payload.
    pub fn into_parts(self) -> (Cid, Bytes) {
        (self.cid, self.data)
    }
}
