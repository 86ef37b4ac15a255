//! Canonical hashing of consensus objects.
//!
//! Two different hashes are derived from overlapping data:
//!
//! - [`ContentHash`] identifies a value: a `VoteData`, a `VoteTimeout`, a
//!   vertex or a certificate. Votes are grouped into quorums by the content
//!   hash of their `VoteData`, and a `LedgerProof` carries it as its opaque
//!   hash.
//! - [`SigningHash`] is what a validator signs for a vote. It binds the
//!   signer's own timestamp, so each signer of a QC signs different bytes and
//!   a QC signature can only be checked against the hash recomputed with that
//!   signer's timestamp.
//!
//! The two are distinct types so one can never be passed where the other is
//! expected.

use {
    crate::{
        types::{LedgerHeader, VoteData},
        vote::Vote,
    },
    serde::{Deserialize, Serialize},
    solana_hash::Hash,
    std::fmt,
};

/// Presence marker written before the opaque hash in a signing buffer.
const LEDGER_HEADER_PRESENT: u32 = 0;
const LEDGER_HEADER_ABSENT: u32 = 1;

/// Hash identifying the content of a consensus value.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ContentHash(Hash);

impl ContentHash {
    pub const fn new(hash: Hash) -> Self {
        Self(hash)
    }

    /// The all-zero hash, used as the vertex id of the genesis ancestor.
    pub fn zero() -> Self {
        Self(Hash::default())
    }

    pub fn as_hash(&self) -> &Hash {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Hash a validator signs when casting a vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SigningHash(Hash);

impl SigningHash {
    pub fn as_hash(&self) -> &Hash {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl fmt::Display for SigningHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Fixed, big-endian byte layout of a consensus value.
///
/// Every node must produce identical bytes for equal values, so
/// implementations write fields in declaration order and never depend on
/// hash-map iteration order.
pub trait CanonicalEncode {
    fn encode_canonical(&self, buf: &mut Vec<u8>);

    fn canonical_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.encode_canonical(&mut buf);
        buf
    }
}

/// Fixed-width hash function used for all consensus hashing.
pub trait Hasher {
    fn hash_bytes(&self, bytes: &[u8]) -> Hash;

    /// Content hash of a value.
    fn hash<T: CanonicalEncode + ?Sized>(&self, value: &T) -> ContentHash {
        ContentHash(self.hash_bytes(&value.canonical_bytes()))
    }
}

/// SHA-256 hasher.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl Hasher for Sha256Hasher {
    fn hash_bytes(&self, bytes: &[u8]) -> Hash {
        solana_sha256_hasher::hash(bytes)
    }
}

impl<H: Hasher + ?Sized> Hasher for &H {
    fn hash_bytes(&self, bytes: &[u8]) -> Hash {
        (**self).hash_bytes(bytes)
    }
}

/// Compute the hash a validator signs.
///
/// Layout: a 4-byte presence marker for the ledger header (0 present,
/// 1 absent), the 32-byte `opaque` hash, the canonical ledger header when
/// present, then the signer's 8-byte `node_timestamp`.
pub fn signing_hash<H: Hasher + ?Sized>(
    hasher: &H,
    opaque: &ContentHash,
    committed_ledger_header: Option<&LedgerHeader>,
    node_timestamp: i64,
) -> SigningHash {
    let mut buf = Vec::with_capacity(128);
    match committed_ledger_header {
        Some(header) => {
            buf.extend_from_slice(&LEDGER_HEADER_PRESENT.to_be_bytes());
            buf.extend_from_slice(opaque.as_bytes());
            header.encode_canonical(&mut buf);
        }
        None => {
            buf.extend_from_slice(&LEDGER_HEADER_ABSENT.to_be_bytes());
            buf.extend_from_slice(opaque.as_bytes());
        }
    }
    buf.extend_from_slice(&node_timestamp.to_be_bytes());
    SigningHash(hasher.hash_bytes(&buf))
}

/// Signing hash for a vote on `vote_data` cast at `timestamp`.
///
/// This is also what a verifier recomputes for each entry of a QC, using the
/// timestamp recorded next to that signer's signature.
pub fn vote_data_signing_hash<H: Hasher + ?Sized>(
    hasher: &H,
    vote_data: &VoteData,
    timestamp: i64,
) -> SigningHash {
    let opaque = hasher.hash(vote_data);
    signing_hash(
        hasher,
        &opaque,
        vote_data.committed().map(|header| header.ledger_header()),
        timestamp,
    )
}

/// Signing hash for `vote`.
pub fn vote_signing_target<H: Hasher + ?Sized>(hasher: &H, vote: &Vote) -> SigningHash {
    vote_data_signing_hash(hasher, vote.vote_data(), vote.timestamp())
}
