//! Content identifiers and their canonical order.

use cid::Cid;
use core::{cmp::Ordering, fmt};

/// Upper bound on the encoded size of a `Multihash<64>`: a u64 varint code, a one or two byte
/// varint length and up to 64 digest bytes.
const MAX_MULTIHASH_LEN: usize = 10 + 2 + 64;

/// A [`Cid`] ordered canonically.
///
/// The canonical order compares the encoded multihash byte-wise. It is the order in which the
/// block store and the provide ledger lay out their keys, so every sorted stream in the
/// reprovide pipeline is ascending under this order. The codec (and the CID version) only break
/// ties between identifiers sharing a multihash, which keeps the order total and consistent
/// with equality.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[derive(derive_more::From, derive_more::Into, derive_more::Display)]
#[display("{_0}")]
pub struct ContentId(Cid);

impl ContentId {
    /// Wraps a [`Cid`].
    pub const fn new(cid: Cid) -> Self {
        Self(cid)
    }

    /// Returns the wrapped [`Cid`].
    pub const fn cid(&self) -> &Cid {
        &self.0
    }

    /// Returns the storage key of this identifier: the encoded multihash.
    pub fn storage_key(&self) -> Vec<u8> {
        storage_key(&self.0)
    }

    fn encode_multihash(&self, buf: &mut [u8; MAX_MULTIHASH_LEN]) -> usize {
        // The buffer always fits a `Multihash<64>`.
        self.0.hash().write(&mut buf[..]).unwrap_or(0)
    }
}

impl fmt::Debug for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentId({})", self.0)
    }
}

impl Ord for ContentId {
    fn cmp(&self, other: &Self) -> Ordering {
        let (mut lhs, mut rhs) = ([0u8; MAX_MULTIHASH_LEN], [0u8; MAX_MULTIHASH_LEN]);
        let lhs_len = self.encode_multihash(&mut lhs);
        let rhs_len = other.encode_multihash(&mut rhs);
        lhs[..lhs_len].cmp(&rhs[..rhs_len]).then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for ContentId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl AsRef<Cid> for ContentId {
    fn as_ref(&self) -> &Cid {
        &self.0
    }
}

/// Returns the storage key for a [`Cid`]: its encoded multihash.
///
/// Keys compare byte-wise in the canonical [`ContentId`] order.
pub fn storage_key(cid: &Cid) -> Vec<u8> {
    cid.hash().to_bytes()
}
