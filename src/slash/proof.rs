//! Slashing proof objects and their wire encoding.
//!
//! A proof is an immutable evidence package. The encoding is the canonical
//! bincode serialization of the tagged union below and is the contract with
//! the on-chain slashing processor — a change requires a coordinated upgrade.

use crate::errors::SlashingError;
use crate::types::{HeaderInfo, PublicKeyBytes};
use crate::slash::{SlashingResult, SlashingType, ThreatLevel};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Evidence that one validator proposed several conflicting headers in the
/// same round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultipleProposalProof {
    pub(crate) slash_type: SlashingType,
    pub(crate) result: SlashingResult,
}

impl MultipleProposalProof {
    pub fn new(result: SlashingResult) -> Self {
        Self { slash_type: SlashingType::MultipleProposal, result }
    }

    /// The type tag carried on the wire. Normally `MultipleProposal`; a
    /// decoded proof may disagree with its payload and is rejected during
    /// validation.
    pub fn slash_type(&self) -> SlashingType {
        self.slash_type
    }

    pub fn level(&self) -> ThreatLevel {
        self.result.level
    }

    /// Conflicting headers in observation order.
    pub fn headers(&self) -> &[HeaderInfo] {
        &self.result.headers
    }

    pub fn result(&self) -> &SlashingResult {
        &self.result
    }
}

/// Evidence that validators signed several conflicting headers in the same
/// round, keyed per signer. One intercepted header can implicate many
/// signers at once.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultipleSigningProof {
    pub(crate) slash_type: SlashingType,
    pub(crate) by_signer: BTreeMap<PublicKeyBytes, SlashingResult>,
}

impl MultipleSigningProof {
    pub fn new(by_signer: BTreeMap<PublicKeyBytes, SlashingResult>) -> Self {
        Self { slash_type: SlashingType::MultipleSigning, by_signer }
    }

    pub fn slash_type(&self) -> SlashingType {
        self.slash_type
    }

    /// Implicated signers, in key order.
    pub fn signers(&self) -> impl Iterator<Item = &PublicKeyBytes> {
        self.by_signer.keys()
    }

    pub fn level_of(&self, pub_key: &PublicKeyBytes) -> Option<ThreatLevel> {
        self.by_signer.get(pub_key).map(|r| r.level)
    }

    /// Conflicting headers attributed to `pub_key`, in observation order.
    /// Empty when the signer is not part of this proof.
    pub fn headers_of(&self, pub_key: &PublicKeyBytes) -> &[HeaderInfo] {
        self.by_signer
            .get(pub_key)
            .map(|r| r.headers.as_slice())
            .unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PublicKeyBytes, &SlashingResult)> {
        self.by_signer.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.by_signer.is_empty()
    }
}

/// Tagged union of every proof kind the detectors emit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlashingProof {
    MultipleProposal(MultipleProposalProof),
    MultipleSigning(MultipleSigningProof),
}

impl SlashingProof {
    pub fn slash_type(&self) -> SlashingType {
        match self {
            SlashingProof::MultipleProposal(p) => p.slash_type(),
            SlashingProof::MultipleSigning(p) => p.slash_type(),
        }
    }

    pub fn as_multiple_proposal(&self) -> Result<&MultipleProposalProof, SlashingError> {
        match self {
            SlashingProof::MultipleProposal(p) => Ok(p),
            _ => Err(SlashingError::CannotCastProofToMultipleProposedHeaders),
        }
    }

    pub fn as_multiple_signing(&self) -> Result<&MultipleSigningProof, SlashingError> {
        match self {
            SlashingProof::MultipleSigning(p) => Ok(p),
            _ => Err(SlashingError::CannotCastProofToMultipleSignedHeaders),
        }
    }
}

pub fn encode_proof(proof: &SlashingProof) -> Result<Vec<u8>, SlashingError> {
    bincode::serialize(proof).map_err(|e| SlashingError::ProofEncode(e.to_string()))
}

pub fn decode_proof(bytes: &[u8]) -> Result<SlashingProof, SlashingError> {
    bincode::deserialize(bytes).map_err(|e| SlashingError::ProofDecode(e.to_string()))
}
