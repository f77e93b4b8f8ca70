use thiserror::Error;

/// Every failure the slashing core can surface. All variants are recoverable;
/// nothing is retried internally and nothing here is fatal to the node.
///
/// `NoSlashingEventDetected` is the common case: the header was accepted and
/// cached but no equivocation exists yet. Callers treat it as "keep watching".
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SlashingError {
    #[error("intercepted data does not carry a block header")]
    CannotCastInterceptedDataToHeader,

    #[error("intercepted header has no header payload")]
    NilHeaderHandler,

    #[error("header round is outside the relevant window")]
    HeaderRoundNotRelevant,

    #[error("nodes coordinator returned an empty consensus group")]
    EmptyConsensusGroup,

    #[error("headers do not have different hashes")]
    HeadersNotDifferentHashes,

    #[error("no slashing event detected")]
    NoSlashingEventDetected,

    #[error("not enough headers provided for a slashing proof")]
    NotEnoughHeadersProvided,

    #[error("invalid slash level")]
    InvalidSlashLevel,

    #[error("slash level does not match the provided headers")]
    SlashLevelDoesNotMatchSlashType,

    #[error("proof headers are not all from the same round")]
    HeadersNotSameRound,

    #[error("proof headers do not resolve to the same proposer")]
    HeadersNotSameProposer,

    #[error("cannot cast proof to multiple-proposed-headers proof")]
    CannotCastProofToMultipleProposedHeaders,

    #[error("cannot cast proof to multiple-signed-headers proof")]
    CannotCastProofToMultipleSignedHeaders,

    #[error("proof slash type does not match its payload")]
    InvalidSlashType,

    #[error("signer is not part of the consensus group")]
    SignerNotInConsensusGroup,

    #[error("signers bitmap does not mark the header as signed")]
    SignerDidNotSignHeader,

    #[error("proof encode failed: {0}")]
    ProofEncode(String),

    #[error("proof decode failed: {0}")]
    ProofDecode(String),

    #[error("nodes coordinator error: {0}")]
    Coordinator(String),
}
