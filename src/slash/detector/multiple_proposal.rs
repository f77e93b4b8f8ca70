use crate::config::SlashingConfig;
use crate::coordinator::{NodesCoordinator, RoundHandler};
use crate::errors::SlashingError;
use crate::intercepted::{self, InterceptedData};
use crate::slash::detector::{check_threat_level, RoundValidatorHeadersCache};
use crate::slash::proof::{MultipleProposalProof, SlashingProof};
use crate::slash::{threat_level_for, SlashingResult, SlashingType, MIN_SLASHABLE_HEADERS};
use crate::types::{HeaderInfo, PublicKeyBytes, Round, ShardHeader};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Watches intercepted headers for a proposer producing several conflicting
/// headers in the same round.
///
/// Safe under concurrent `verify_data` / `validate_proof`: the cache owns the
/// only mutable state, and the coordinator is queried outside its lock.
pub struct MultipleProposalDetector {
    coordinator: Arc<dyn NodesCoordinator>,
    round_handler: Arc<dyn RoundHandler>,
    cache: RoundValidatorHeadersCache,
    max_delta: u64,
}

impl MultipleProposalDetector {
    pub fn new(
        coordinator: Arc<dyn NodesCoordinator>,
        round_handler: Arc<dyn RoundHandler>,
        config: &SlashingConfig,
    ) -> Self {
        Self {
            coordinator,
            round_handler,
            cache: RoundValidatorHeadersCache::new(config.cache_rounds),
            max_delta: config.max_delta_to_current_round,
        }
    }

    /// Processes one intercepted header.
    ///
    /// Returns a proof once the round's proposer has two or more distinct
    /// headers on record; `NoSlashingEventDetected` means the header was
    /// accepted but no equivocation exists yet.
    pub fn verify_data(&self, data: &dyn InterceptedData) -> Result<SlashingProof, SlashingError> {
        let info = intercepted::to_header_info(data)?;
        let round = info.header.round;
        self.check_round_relevance(round)?;

        let proposer = self.proposer_for(&info.header)?;
        let headers = self.cache.add_and_snapshot(round, &proposer, info)?;
        if headers.len() < MIN_SLASHABLE_HEADERS {
            debug!(round, "first header on record for this proposer");
            return Err(SlashingError::NoSlashingEventDetected);
        }

        warn!(
            proposer = %hex::encode(&proposer.0),
            round,
            headers = headers.len(),
            "proposer equivocation detected"
        );
        let result = SlashingResult {
            level: threat_level_for(headers.len()),
            headers,
        };
        Ok(SlashingProof::MultipleProposal(MultipleProposalProof::new(result)))
    }

    /// Re-verifies a received proof without touching the detector cache:
    /// purely a function of the proof and the nodes coordinator.
    pub fn validate_proof(&self, proof: &SlashingProof) -> Result<(), SlashingError> {
        let proposal = proof.as_multiple_proposal()?;
        if proposal.slash_type() != SlashingType::MultipleProposal {
            return Err(SlashingError::InvalidSlashType);
        }
        check_threat_level(proposal.headers(), proposal.level())?;
        self.check_proposed_headers(proposal.headers())
    }

    fn check_round_relevance(&self, round: Round) -> Result<(), SlashingError> {
        let current = self.round_handler.current_round();
        if round.abs_diff(current) > self.max_delta {
            debug!(round, current, "discarding header outside the relevant window");
            return Err(SlashingError::HeaderRoundNotRelevant);
        }
        Ok(())
    }

    fn check_proposed_headers(&self, headers: &[HeaderInfo]) -> Result<(), SlashingError> {
        let first = headers.first().ok_or(SlashingError::NotEnoughHeadersProvided)?;
        let round = first.header.round;
        let expected_proposer = self.proposer_for(&first.header)?;

        let mut seen = HashSet::new();
        for info in headers {
            if !seen.insert(info.hash.clone()) {
                return Err(SlashingError::HeadersNotDifferentHashes);
            }
            if info.header.round != round {
                return Err(SlashingError::HeadersNotSameRound);
            }
            let proposer = self.proposer_for(&info.header)?;
            if proposer != expected_proposer {
                return Err(SlashingError::HeadersNotSameProposer);
            }
        }
        Ok(())
    }

    fn proposer_for(&self, header: &ShardHeader) -> Result<PublicKeyBytes, SlashingError> {
        let group = self.coordinator.compute_consensus_group(
            &header.prev_rand_seed,
            header.round,
            header.shard_id,
            header.epoch,
        )?;
        group
            .first()
            .map(|v| v.pub_key.clone())
            .ok_or(SlashingError::EmptyConsensusGroup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slash::ThreatLevel;
    use crate::testutil::{MockNodesCoordinator, MockRoundHandler};
    use crate::types::{hash_bytes, HeaderInfo};
    use std::collections::BTreeMap;

    fn header(round: Round) -> ShardHeader {
        ShardHeader {
            round,
            epoch: 0,
            shard_id: 0,
            prev_rand_seed: b"seed".to_vec(),
            rand_seed: vec![],
            pub_keys_bitmap: vec![],
            timestamp: 0,
        }
    }

    fn detector_with(coordinator: MockNodesCoordinator) -> MultipleProposalDetector {
        MultipleProposalDetector::new(
            Arc::new(coordinator),
            Arc::new(MockRoundHandler::at(2)),
            &SlashingConfig::default(),
        )
    }

    // The tag carried inside a proposal proof can disagree with the enum
    // variant only for decoded (hostile) proofs; craft one directly.
    #[test]
    fn test_validate_proof_mismatched_tag() {
        let detector = detector_with(MockNodesCoordinator::single_proposer(b"p1"));
        let proof = SlashingProof::MultipleProposal(MultipleProposalProof {
            slash_type: SlashingType::MultipleSigning,
            result: SlashingResult {
                level: ThreatLevel::Medium,
                headers: vec![
                    HeaderInfo::new(header(2), hash_bytes(b"h1")),
                    HeaderInfo::new(header(2), hash_bytes(b"h2")),
                ],
            },
        });
        assert_eq!(
            detector.validate_proof(&proof),
            Err(SlashingError::InvalidSlashType)
        );
    }

    #[test]
    fn test_validate_proof_wrong_variant() {
        let detector = detector_with(MockNodesCoordinator::single_proposer(b"p1"));
        let proof = SlashingProof::MultipleSigning(
            crate::slash::proof::MultipleSigningProof::new(BTreeMap::new()),
        );
        assert_eq!(
            detector.validate_proof(&proof),
            Err(SlashingError::CannotCastProofToMultipleProposedHeaders)
        );
    }
}
