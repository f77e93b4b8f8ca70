use crate::config::SlashingConfig;
use crate::coordinator::{ConsensusValidator, NodesCoordinator, RoundHandler};
use crate::errors::SlashingError;
use crate::intercepted::{self, InterceptedData};
use crate::slash::detector::{check_threat_level, RoundValidatorHeadersCache};
use crate::slash::proof::{MultipleSigningProof, SlashingProof};
use crate::slash::{
    is_index_set_in_bitmap, threat_level_for, SlashingResult, SlashingType, MIN_SLASHABLE_HEADERS,
};
use crate::types::{HeaderInfo, PublicKeyBytes, Round, ShardHeader};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// Watches intercepted headers for validators signing several conflicting
/// headers in the same round.
///
/// Unlike the proposal detector, a header is recorded under *every* signer
/// marked in its pubkeys bitmap, so one intercepted header can flip several
/// validators into the slashable state; all of them land in the same proof.
pub struct MultipleSigningDetector {
    coordinator: Arc<dyn NodesCoordinator>,
    round_handler: Arc<dyn RoundHandler>,
    cache: RoundValidatorHeadersCache,
    max_delta: u64,
}

impl MultipleSigningDetector {
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
    /// Records it under every consensus group member marked in the signers
    /// bitmap; every `(round, signer)` pair holding two or more distinct
    /// hashes afterwards contributes an entry to the emitted proof.
    pub fn verify_data(&self, data: &dyn InterceptedData) -> Result<SlashingProof, SlashingError> {
        let info = intercepted::to_header_info(data)?;
        let round = info.header.round;
        self.check_round_relevance(round)?;

        let group = self.consensus_group_for(&info.header)?;
        for (index, validator) in group.iter().enumerate() {
            if !is_index_set_in_bitmap(index as u32, &info.header.pub_keys_bitmap) {
                continue;
            }
            self.cache.add(round, &validator.pub_key, info.clone())?;
        }

        let mut by_signer = BTreeMap::new();
        for pub_key in self.cache.pub_keys(round) {
            let headers = self.cache.headers(round, &pub_key);
            if headers.len() < MIN_SLASHABLE_HEADERS {
                continue;
            }
            by_signer.insert(
                pub_key,
                SlashingResult {
                    level: threat_level_for(headers.len()),
                    headers,
                },
            );
        }

        if by_signer.is_empty() {
            debug!(round, "no signer holds conflicting headers yet");
            return Err(SlashingError::NoSlashingEventDetected);
        }

        for (pub_key, result) in &by_signer {
            warn!(
                signer = %hex::encode(&pub_key.0),
                round,
                headers = result.headers.len(),
                "signer equivocation detected"
            );
        }
        Ok(SlashingProof::MultipleSigning(MultipleSigningProof::new(by_signer)))
    }

    /// Re-verifies a received proof without touching the detector cache.
    pub fn validate_proof(&self, proof: &SlashingProof) -> Result<(), SlashingError> {
        let signing = proof.as_multiple_signing()?;
        if signing.slash_type() != SlashingType::MultipleSigning {
            return Err(SlashingError::InvalidSlashType);
        }
        if signing.is_empty() {
            return Err(SlashingError::NotEnoughHeadersProvided);
        }
        for (pub_key, result) in signing.iter() {
            check_threat_level(&result.headers, result.level)?;
            self.check_signed_headers(pub_key, &result.headers)?;
        }
        Ok(())
    }

    fn check_round_relevance(&self, round: Round) -> Result<(), SlashingError> {
        let current = self.round_handler.current_round();
        if round.abs_diff(current) > self.max_delta {
            debug!(round, current, "discarding header outside the relevant window");
            return Err(SlashingError::HeaderRoundNotRelevant);
        }
        Ok(())
    }

    fn check_signed_headers(
        &self,
        pub_key: &PublicKeyBytes,
        headers: &[HeaderInfo],
    ) -> Result<(), SlashingError> {
        let first = headers.first().ok_or(SlashingError::NotEnoughHeadersProvided)?;
        let round = first.header.round;

        let mut seen = HashSet::new();
        for info in headers {
            if !seen.insert(info.hash.clone()) {
                return Err(SlashingError::HeadersNotDifferentHashes);
            }
            if info.header.round != round {
                return Err(SlashingError::HeadersNotSameRound);
            }

            let group = self.consensus_group_for(&info.header)?;
            let index = group
                .iter()
                .position(|v| &v.pub_key == pub_key)
                .ok_or(SlashingError::SignerNotInConsensusGroup)?;
            if !is_index_set_in_bitmap(index as u32, &info.header.pub_keys_bitmap) {
                return Err(SlashingError::SignerDidNotSignHeader);
            }
        }
        Ok(())
    }

    fn consensus_group_for(
        &self,
        header: &ShardHeader,
    ) -> Result<Vec<ConsensusValidator>, SlashingError> {
        let group = self.coordinator.compute_consensus_group(
            &header.prev_rand_seed,
            header.round,
            header.shard_id,
            header.epoch,
        )?;
        if group.is_empty() {
            return Err(SlashingError::EmptyConsensusGroup);
        }
        Ok(group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slash::ThreatLevel;
    use crate::testutil::{
        make_intercepted, make_signed_header, MockNodesCoordinator, MockRoundHandler,
    };
    use crate::types::hash_bytes;

    fn header(round: Round, bitmap: Vec<u8>) -> ShardHeader {
        ShardHeader {
            round,
            epoch: 0,
            shard_id: 0,
            prev_rand_seed: b"seed".to_vec(),
            rand_seed: vec![],
            pub_keys_bitmap: bitmap,
            timestamp: 0,
        }
    }

    fn detector_with(coordinator: MockNodesCoordinator) -> MultipleSigningDetector {
        MultipleSigningDetector::new(
            Arc::new(coordinator),
            Arc::new(MockRoundHandler::at(2)),
            &SlashingConfig::default(),
        )
    }

    #[test]
    fn test_validate_proof_mismatched_tag() {
        let detector = detector_with(MockNodesCoordinator::fixed_group(&[b"v1", b"v2"]));
        let mut by_signer = BTreeMap::new();
        by_signer.insert(
            PublicKeyBytes(b"v1".to_vec()),
            SlashingResult {
                level: ThreatLevel::Medium,
                headers: vec![
                    HeaderInfo::new(header(2, vec![0b01]), hash_bytes(b"h1")),
                    HeaderInfo::new(header(2, vec![0b01]), hash_bytes(b"h2")),
                ],
            },
        );
        let proof = SlashingProof::MultipleSigning(MultipleSigningProof {
            slash_type: SlashingType::MultipleProposal,
            by_signer,
        });
        assert_eq!(
            detector.validate_proof(&proof),
            Err(SlashingError::InvalidSlashType)
        );
    }

    #[test]
    fn test_validate_proof_wrong_variant() {
        let detector = detector_with(MockNodesCoordinator::fixed_group(&[b"v1"]));
        let proof = SlashingProof::MultipleProposal(
            crate::slash::proof::MultipleProposalProof::new(SlashingResult {
                level: ThreatLevel::Medium,
                headers: vec![],
            }),
        );
        assert_eq!(
            detector.validate_proof(&proof),
            Err(SlashingError::CannotCastProofToMultipleSignedHeaders)
        );
    }

    #[test]
    fn test_validate_proof_empty_map() {
        let detector = detector_with(MockNodesCoordinator::fixed_group(&[b"v1"]));
        let proof =
            SlashingProof::MultipleSigning(MultipleSigningProof::new(BTreeMap::new()));
        assert_eq!(
            detector.validate_proof(&proof),
            Err(SlashingError::NotEnoughHeadersProvided)
        );
    }

    // Group order follows each header's selection randomness, so the same
    // signer can sit at a different bitmap position in each header. Both
    // detection and validation must resolve the index per header.
    #[test]
    fn test_round_trip_when_group_order_differs_per_header() {
        let coordinator = MockNodesCoordinator::returning(|randomness, _, _, _| {
            let ordered: [&[u8]; 2] = if randomness == b"seedA" {
                [b"v1", b"v2"]
            } else {
                [b"v2", b"v1"]
            };
            Ok(ordered
                .iter()
                .map(|pk| ConsensusValidator::new(PublicKeyBytes(pk.to_vec()), 1))
                .collect())
        });
        let detector = detector_with(coordinator);

        // v1 signs both headers: at group index 0 in the first, index 1 in
        // the second. v2 signs neither.
        let h1 = make_intercepted(make_signed_header(2, b"seedA", &[0b01]));
        let h2 = make_intercepted(make_signed_header(2, b"seedB", &[0b10]));

        assert_eq!(
            detector.verify_data(&h1).unwrap_err(),
            SlashingError::NoSlashingEventDetected
        );
        let proof = detector.verify_data(&h2).unwrap();

        let v1 = PublicKeyBytes(b"v1".to_vec());
        let signing = proof.as_multiple_signing().unwrap();
        assert_eq!(signing.level_of(&v1), Some(ThreatLevel::Medium));
        assert_eq!(signing.headers_of(&v1).len(), 2);
        assert_eq!(signing.level_of(&PublicKeyBytes(b"v2".to_vec())), None);

        detector.validate_proof(&proof).unwrap();
    }
}
