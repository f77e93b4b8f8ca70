//! TOML configuration for the slashing core.
//!
//! The embedding node loads this as one section of its config file and hands
//! it to the detectors at construction time. No environment variables are
//! read here; overrides are the node's concern.

use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlashingConfig {
    /// Maximum number of distinct rounds each detector cache retains.
    pub cache_rounds: u64,
    /// How far (in rounds, both directions) from the current round an
    /// intercepted header is still admissible.
    pub max_delta_to_current_round: u64,
}

impl Default for SlashingConfig {
    fn default() -> Self {
        Self {
            cache_rounds: 100,
            max_delta_to_current_round: 3,
        }
    }
}

impl SlashingConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        if !Path::new(path).exists() {
            return Ok(Self::default());
        }
        let s = std::fs::read_to_string(path)?;
        let cfg: SlashingConfig = toml::from_str(&s)?;
        Ok(cfg)
    }

    pub fn example_toml() -> &'static str {
        r#"# Tessera slashing detector configuration
# All values shown are defaults.

cache_rounds               = 100  # distinct rounds of evidence retained per cache
max_delta_to_current_round = 3    # admissible distance from the current round
"#
    }
}
