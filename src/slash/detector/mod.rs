//! Detectors and the round-indexed evidence caches behind them.

use crate::errors::SlashingError;
use crate::slash::{ThreatLevel, MIN_SLASHABLE_HEADERS};
use crate::types::HeaderInfo;

mod multiple_proposal;
mod multiple_signing;
mod round_headers_cache;
mod round_validator_headers_cache;

pub use multiple_proposal::MultipleProposalDetector;
pub use multiple_signing::MultipleSigningDetector;
pub use round_headers_cache::RoundHeadersCache;
pub use round_validator_headers_cache::RoundValidatorHeadersCache;

/// Checks that a proof's severity is consistent with the number of headers
/// it carries: exactly two headers is `Medium`, three or more is `High`.
pub(crate) fn check_threat_level(
    headers: &[HeaderInfo],
    level: ThreatLevel,
) -> Result<(), SlashingError> {
    if level < ThreatLevel::Medium || level > ThreatLevel::High {
        return Err(SlashingError::InvalidSlashLevel);
    }
    if headers.len() < MIN_SLASHABLE_HEADERS {
        return Err(SlashingError::NotEnoughHeadersProvided);
    }
    if headers.len() == MIN_SLASHABLE_HEADERS && level != ThreatLevel::Medium {
        return Err(SlashingError::SlashLevelDoesNotMatchSlashType);
    }
    if headers.len() > MIN_SLASHABLE_HEADERS && level != ThreatLevel::High {
        return Err(SlashingError::SlashLevelDoesNotMatchSlashType);
    }
    Ok(())
}
