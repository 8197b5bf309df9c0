//! Engine configuration.
//!
//! Every knob has a default, so `EngineConfig::default()` is a working
//! configuration and a JSON document only needs to name what it overrides.

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid engine configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("max_list_pages must be at least 1")]
    NoListPages,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Upper bound on list pages walked while resolving an identity.
    pub max_list_pages: usize,
    /// Give up after this many progress checks. `None` leaves it to the orchestrator.
    pub max_stabilization_checks: Option<u32>,
    /// Observed tag keys with these prefixes belong to the remote system and are never removed.
    pub reserved_tag_prefixes: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_list_pages: 100,
            max_stabilization_checks: None,
            reserved_tag_prefixes: Vec::new(),
        }
    }
}

impl EngineConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_list_pages == 0 {
            return Err(ConfigError::NoListPages);
        }
        Ok(())
    }
}
