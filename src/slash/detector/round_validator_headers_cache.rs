use crate::errors::SlashingError;
use crate::types::{Hash32, HeaderInfo, PublicKeyBytes, Round};
use parking_lot::RwLock;
use std::collections::BTreeMap;

type ValidatorBuckets = BTreeMap<PublicKeyBytes, Vec<HeaderInfo>>;

/// Sliding-window cache of headers keyed by `(round, validator pubkey)`.
///
/// Eviction works on the outer round dimension exactly as in
/// [`super::RoundHeadersCache`]; hash deduplication is scoped to one
/// `(round, pubkey)` pair, so the same header may legitimately appear under
/// several signers of the same round.
pub struct RoundValidatorHeadersCache {
    inner: RwLock<BTreeMap<Round, ValidatorBuckets>>,
    capacity: u64,
}

impl RoundValidatorHeadersCache {
    pub fn new(max_rounds: u64) -> Self {
        Self {
            inner: RwLock::new(BTreeMap::new()),
            capacity: max_rounds,
        }
    }

    /// Records a header under `(round, pub_key)`.
    pub fn add(
        &self,
        round: Round,
        pub_key: &PublicKeyBytes,
        header: HeaderInfo,
    ) -> Result<(), SlashingError> {
        let mut cache = self.inner.write();
        add_locked(&mut cache, self.capacity, round, pub_key, header)
    }

    /// Records a header and returns the full `(round, pub_key)` bucket, as
    /// one critical section: no other writer can interleave between the
    /// insert and the read.
    pub fn add_and_snapshot(
        &self,
        round: Round,
        pub_key: &PublicKeyBytes,
        header: HeaderInfo,
    ) -> Result<Vec<HeaderInfo>, SlashingError> {
        let mut cache = self.inner.write();
        add_locked(&mut cache, self.capacity, round, pub_key, header)?;
        Ok(cache
            .get(&round)
            .and_then(|buckets| buckets.get(pub_key))
            .cloned()
            .unwrap_or_default())
    }

    pub fn contains(&self, round: Round, pub_key: &PublicKeyBytes, hash: &Hash32) -> bool {
        bucket_contains(&self.inner.read(), round, pub_key, hash)
    }

    /// Validators with recorded headers for `round`, in key order.
    pub fn pub_keys(&self, round: Round) -> Vec<PublicKeyBytes> {
        self.inner
            .read()
            .get(&round)
            .map(|buckets| buckets.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Headers recorded under `(round, pub_key)`, in insertion order.
    pub fn headers(&self, round: Round, pub_key: &PublicKeyBytes) -> Vec<HeaderInfo> {
        self.inner
            .read()
            .get(&round)
            .and_then(|buckets| buckets.get(pub_key))
            .cloned()
            .unwrap_or_default()
    }

    /// Oldest retained round; `u64::MAX` when empty.
    pub fn oldest_round(&self) -> Round {
        self.inner.read().keys().next().copied().unwrap_or(u64::MAX)
    }

    pub fn round_count(&self) -> usize {
        self.inner.read().len()
    }
}

fn add_locked(
    cache: &mut BTreeMap<Round, ValidatorBuckets>,
    capacity: u64,
    round: Round,
    pub_key: &PublicKeyBytes,
    header: HeaderInfo,
) -> Result<(), SlashingError> {
    if bucket_contains(cache, round, pub_key, &header.hash) {
        return Err(SlashingError::HeadersNotDifferentHashes);
    }

    if cache.len() >= capacity as usize && !cache.contains_key(&round) {
        let oldest = cache.keys().next().copied().unwrap_or(u64::MAX);
        if round < oldest {
            return Err(SlashingError::HeaderRoundNotRelevant);
        }
        cache.remove(&oldest);
    }

    cache
        .entry(round)
        .or_default()
        .entry(pub_key.clone())
        .or_default()
        .push(header);
    Ok(())
}

fn bucket_contains(
    cache: &BTreeMap<Round, ValidatorBuckets>,
    round: Round,
    pub_key: &PublicKeyBytes,
    hash: &Hash32,
) -> bool {
    cache
        .get(&round)
        .and_then(|buckets| buckets.get(pub_key))
        .map(|bucket| bucket.iter().any(|h| &h.hash == hash))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{hash_bytes, ShardHeader};

    fn pk(tag: &str) -> PublicKeyBytes {
        PublicKeyBytes(tag.as_bytes().to_vec())
    }

    fn info(round: Round, hash_tag: &[u8]) -> HeaderInfo {
        let header = ShardHeader {
            round,
            epoch: 0,
            shard_id: 0,
            prev_rand_seed: vec![],
            rand_seed: vec![],
            pub_keys_bitmap: vec![],
            timestamp: 0,
        };
        HeaderInfo::new(header, hash_bytes(hash_tag))
    }

    #[test]
    fn test_dedup_is_scoped_to_round_and_pubkey() {
        let cache = RoundValidatorHeadersCache::new(2);

        assert!(cache.add(1, &pk("v1"), info(1, b"h1")).is_ok());
        // Same hash, same round, different validator: accepted.
        assert!(cache.add(1, &pk("v2"), info(1, b"h1")).is_ok());
        // Same hash, same pair: rejected.
        assert_eq!(
            cache.add(1, &pk("v1"), info(1, b"h1")),
            Err(SlashingError::HeadersNotDifferentHashes)
        );
        // Same hash, same validator, different round: accepted.
        assert!(cache.add(2, &pk("v1"), info(2, b"h1")).is_ok());

        assert_eq!(cache.headers(1, &pk("v1")).len(), 1);
        assert_eq!(cache.headers(1, &pk("v2")).len(), 1);
        assert_eq!(cache.headers(2, &pk("v1")).len(), 1);
    }

    #[test]
    fn test_eviction_on_outer_round_dimension() {
        let cache = RoundValidatorHeadersCache::new(2);

        cache.add(1, &pk("v1"), info(1, b"h1")).unwrap();
        cache.add(2, &pk("v1"), info(2, b"h2")).unwrap();

        assert_eq!(
            cache.add(0, &pk("v2"), info(0, b"h0")),
            Err(SlashingError::HeaderRoundNotRelevant)
        );

        cache.add(3, &pk("v1"), info(3, b"h3")).unwrap();
        assert_eq!(cache.round_count(), 2);
        assert!(cache.headers(1, &pk("v1")).is_empty());
        assert_eq!(cache.oldest_round(), 2);
    }

    #[test]
    fn test_add_and_snapshot_returns_fifo_bucket() {
        let cache = RoundValidatorHeadersCache::new(2);

        let first = cache.add_and_snapshot(4, &pk("v1"), info(4, b"a")).unwrap();
        assert_eq!(first.len(), 1);

        let second = cache.add_and_snapshot(4, &pk("v1"), info(4, b"b")).unwrap();
        assert_eq!(second.len(), 2);
        assert_eq!(second[0].hash, hash_bytes(b"a"));
        assert_eq!(second[1].hash, hash_bytes(b"b"));
    }

    #[test]
    fn test_pub_keys_sorted_and_scoped() {
        let cache = RoundValidatorHeadersCache::new(2);
        cache.add(1, &pk("zeta"), info(1, b"h1")).unwrap();
        cache.add(1, &pk("alpha"), info(1, b"h2")).unwrap();
        cache.add(2, &pk("mid"), info(2, b"h3")).unwrap();

        assert_eq!(cache.pub_keys(1), vec![pk("alpha"), pk("zeta")]);
        assert_eq!(cache.pub_keys(2), vec![pk("mid")]);
        assert!(cache.pub_keys(3).is_empty());
    }

    #[test]
    fn test_contains() {
        let cache = RoundValidatorHeadersCache::new(2);
        cache.add(1, &pk("v1"), info(1, b"h1")).unwrap();

        assert!(cache.contains(1, &pk("v1"), &hash_bytes(b"h1")));
        assert!(!cache.contains(1, &pk("v2"), &hash_bytes(b"h1")));
        assert!(!cache.contains(2, &pk("v1"), &hash_bytes(b"h1")));
    }
}
