//! Programmable fakes for the detector's collaborators.
//!
//! Kept in-crate so both the unit suites and the integration tests drive the
//! detectors through the same doubles.

use crate::coordinator::{ConsensusValidator, NodesCoordinator, RoundHandler};
use crate::errors::SlashingError;
use crate::intercepted::{InterceptedData, InterceptedHeaderInfo};
use crate::types::{Epoch, Hash32, PublicKeyBytes, Round, ShardHeader, ShardId};
use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};

type ComputeFn =
    dyn Fn(&[u8], Round, ShardId, Epoch) -> Result<Vec<ConsensusValidator>, SlashingError>
        + Send
        + Sync;

/// Nodes coordinator whose answers are programmed per test.
pub struct MockNodesCoordinator {
    compute: Box<ComputeFn>,
}

impl MockNodesCoordinator {
    /// Coordinator answering with whatever the closure returns.
    pub fn returning<F>(f: F) -> Self
    where
        F: Fn(&[u8], Round, ShardId, Epoch) -> Result<Vec<ConsensusValidator>, SlashingError>
            + Send
            + Sync
            + 'static,
    {
        Self { compute: Box::new(f) }
    }

    /// Coordinator with a one-validator group: every round has this proposer.
    pub fn single_proposer(pub_key: &[u8]) -> Self {
        let group = vec![ConsensusValidator::new(PublicKeyBytes(pub_key.to_vec()), 1)];
        Self::returning(move |_, _, _, _| Ok(group.clone()))
    }

    /// Coordinator answering every query with the same ordered group.
    pub fn fixed_group<T: AsRef<[u8]>>(pub_keys: &[T]) -> Self {
        let group: Vec<ConsensusValidator> = pub_keys
            .iter()
            .map(|pk| ConsensusValidator::new(PublicKeyBytes(pk.as_ref().to_vec()), 1))
            .collect();
        Self::returning(move |_, _, _, _| Ok(group.clone()))
    }

    /// Coordinator that always fails, for error propagation tests.
    pub fn failing(message: &str) -> Self {
        let message = message.to_string();
        Self::returning(move |_, _, _, _| Err(SlashingError::Coordinator(message.clone())))
    }
}

impl NodesCoordinator for MockNodesCoordinator {
    fn compute_consensus_group(
        &self,
        randomness: &[u8],
        round: Round,
        shard_id: ShardId,
        epoch: Epoch,
    ) -> Result<Vec<ConsensusValidator>, SlashingError> {
        (self.compute)(randomness, round, shard_id, epoch)
    }
}

/// Round handler pinned to a settable round.
pub struct MockRoundHandler {
    round: AtomicU64,
}

impl MockRoundHandler {
    pub fn at(round: Round) -> Self {
        Self { round: AtomicU64::new(round) }
    }

    pub fn advance_to(&self, round: Round) {
        self.round.store(round, Ordering::SeqCst);
    }
}

impl RoundHandler for MockRoundHandler {
    fn current_round(&self) -> Round {
        self.round.load(Ordering::SeqCst)
    }
}

/// Header with the given round and selection randomness; everything else is
/// fixed, so distinct seeds yield distinct hashes.
pub fn make_header(round: Round, prev_rand_seed: &[u8]) -> ShardHeader {
    ShardHeader {
        round,
        epoch: 0,
        shard_id: 0,
        prev_rand_seed: prev_rand_seed.to_vec(),
        rand_seed: vec![],
        pub_keys_bitmap: vec![],
        timestamp: 0,
    }
}

/// Same as [`make_header`] with an explicit signers bitmap.
pub fn make_signed_header(round: Round, prev_rand_seed: &[u8], bitmap: &[u8]) -> ShardHeader {
    ShardHeader {
        pub_keys_bitmap: bitmap.to_vec(),
        ..make_header(round, prev_rand_seed)
    }
}

/// Wraps a header into an intercepted envelope, hashing it the way the
/// interceptor does.
pub fn make_intercepted(header: ShardHeader) -> InterceptedHeaderInfo {
    let hash = header.id();
    InterceptedHeaderInfo::new(header, hash)
}

/// Intercepted data that is not a header; used to exercise the downcast
/// failure path.
pub struct InterceptedTxStub {
    hash: Hash32,
}

impl InterceptedTxStub {
    pub fn new() -> Self {
        Self { hash: Hash32::zero() }
    }
}

impl Default for InterceptedTxStub {
    fn default() -> Self {
        Self::new()
    }
}

impl InterceptedData for InterceptedTxStub {
    fn hash(&self) -> &Hash32 {
        &self.hash
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
