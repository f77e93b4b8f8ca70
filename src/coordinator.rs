use crate::errors::SlashingError;
use crate::types::{Epoch, PublicKeyBytes, Round, ShardId};
use serde::{Deserialize, Serialize};

/// A validator as reported by the nodes coordinator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusValidator {
    pub pub_key: PublicKeyBytes,
    pub power: u64,
}

impl ConsensusValidator {
    pub fn new(pub_key: PublicKeyBytes, power: u64) -> Self {
        Self { pub_key, power }
    }
}

/// Computes the ordered consensus group for a round. Index 0 is the proposer.
///
/// Implementations are expected to be thread-safe query services backed by
/// epoch state; the detector treats them as external and never caches their
/// answers.
pub trait NodesCoordinator: Send + Sync {
    fn compute_consensus_group(
        &self,
        randomness: &[u8],
        round: Round,
        shard_id: ShardId,
        epoch: Epoch,
    ) -> Result<Vec<ConsensusValidator>, SlashingError>;
}

/// Supplies the chain's current round. Used only to discard stale headers.
pub trait RoundHandler: Send + Sync {
    fn current_round(&self) -> Round;
}
