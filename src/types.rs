use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub type Round = u64;
pub type Epoch = u32;
pub type ShardId = u32;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct Hash32(pub [u8; 32]);

impl Hash32 {
    pub fn zero() -> Self { Self([0u8; 32]) }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct PublicKeyBytes(pub Vec<u8>);

/// Shard block header, reduced to the fields the slashing core reads.
///
/// Headers are opaque immutable values here: the detector never recomputes
/// the hash and never mutates a header it has cached.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardHeader {
    pub round: Round,
    pub epoch: Epoch,
    pub shard_id: ShardId,
    /// Randomness of the previous block; seeds consensus group selection
    /// for this round.
    pub prev_rand_seed: Vec<u8>,
    pub rand_seed: Vec<u8>,
    /// One bit per consensus group member; bit i set means the validator at
    /// group position i signed this header.
    pub pub_keys_bitmap: Vec<u8>,
    pub timestamp: u64,
}

impl ShardHeader {
    /// Deterministic header ID using a fixed binary format.
    ///
    /// Format: "TSR_HDR" || round(8 LE) || epoch(4 LE) || shard(4 LE) ||
    ///         prev_rand_seed_len(2 LE) || prev_rand_seed ||
    ///         rand_seed_len(2 LE) || rand_seed ||
    ///         bitmap_len(2 LE) || bitmap || timestamp(8 LE)
    ///
    /// This is stable across serde versions and encoding whitespace changes.
    pub fn id(&self) -> Hash32 {
        let mut buf = Vec::with_capacity(
            7 + 8 + 4 + 4
                + 2 + self.prev_rand_seed.len()
                + 2 + self.rand_seed.len()
                + 2 + self.pub_keys_bitmap.len()
                + 8,
        );
        buf.extend_from_slice(b"TSR_HDR");
        buf.extend_from_slice(&self.round.to_le_bytes());
        buf.extend_from_slice(&self.epoch.to_le_bytes());
        buf.extend_from_slice(&self.shard_id.to_le_bytes());
        buf.extend_from_slice(&(self.prev_rand_seed.len() as u16).to_le_bytes());
        buf.extend_from_slice(&self.prev_rand_seed);
        buf.extend_from_slice(&(self.rand_seed.len() as u16).to_le_bytes());
        buf.extend_from_slice(&self.rand_seed);
        buf.extend_from_slice(&(self.pub_keys_bitmap.len() as u16).to_le_bytes());
        buf.extend_from_slice(&self.pub_keys_bitmap);
        buf.extend_from_slice(&self.timestamp.to_le_bytes());
        hash_bytes(&buf)
    }
}

/// A header together with its canonical hash, as supplied by the caller.
/// The hash is never recomputed inside the slashing core.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderInfo {
    pub header: Arc<ShardHeader>,
    pub hash: Hash32,
}

impl HeaderInfo {
    pub fn new(header: ShardHeader, hash: Hash32) -> Self {
        Self { header: Arc::new(header), hash }
    }
}

pub fn hash_bytes(b: &[u8]) -> Hash32 {
    let h = blake3::hash(b);
    let mut out = [0u8; 32];
    out.copy_from_slice(h.as_bytes());
    Hash32(out)
}
