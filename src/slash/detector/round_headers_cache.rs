use crate::errors::SlashingError;
use crate::types::{Hash32, HeaderInfo, Round};
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// Sliding-window cache of headers keyed by round only.
///
/// Retains at most `capacity` distinct rounds; when full, inserting into a
/// newer round evicts the oldest one, and headers for rounds older than the
/// window are rejected. Hashes are deduplicated within a round.
pub struct RoundHeadersCache {
    inner: RwLock<BTreeMap<Round, Vec<HeaderInfo>>>,
    capacity: u64,
}

impl RoundHeadersCache {
    pub fn new(max_rounds: u64) -> Self {
        Self {
            inner: RwLock::new(BTreeMap::new()),
            capacity: max_rounds,
        }
    }

    /// Records a header under `round`.
    ///
    /// Fails with `HeadersNotDifferentHashes` when the hash is already
    /// present in that round, and with `HeaderRoundNotRelevant` when the
    /// cache is full and `round` predates the retained window.
    pub fn add(&self, round: Round, header: HeaderInfo) -> Result<(), SlashingError> {
        let mut cache = self.inner.write();

        if bucket_contains(&cache, round, &header.hash) {
            return Err(SlashingError::HeadersNotDifferentHashes);
        }

        if cache.len() >= self.capacity as usize && !cache.contains_key(&round) {
            let oldest = oldest_round(&cache);
            if round < oldest {
                return Err(SlashingError::HeaderRoundNotRelevant);
            }
            cache.remove(&oldest);
        }

        cache.entry(round).or_default().push(header);
        Ok(())
    }

    pub fn contains(&self, round: Round, hash: &Hash32) -> bool {
        bucket_contains(&self.inner.read(), round, hash)
    }

    /// Headers recorded for `round`, in insertion order.
    pub fn headers(&self, round: Round) -> Vec<HeaderInfo> {
        self.inner.read().get(&round).cloned().unwrap_or_default()
    }

    /// Oldest retained round; `u64::MAX` when empty.
    pub fn oldest_round(&self) -> Round {
        oldest_round(&self.inner.read())
    }

    pub fn round_count(&self) -> usize {
        self.inner.read().len()
    }
}

fn oldest_round(cache: &BTreeMap<Round, Vec<HeaderInfo>>) -> Round {
    cache.keys().next().copied().unwrap_or(u64::MAX)
}

fn bucket_contains(cache: &BTreeMap<Round, Vec<HeaderInfo>>, round: Round, hash: &Hash32) -> bool {
    cache
        .get(&round)
        .map(|bucket| bucket.iter().any(|h| &h.hash == hash))
        .unwrap_or(false)
}
