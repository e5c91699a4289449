//! Generator configuration
//!
//! Every field has a default, so a config file only needs to name what it changes.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::{CHUNK_SIZE, DEFAULT_RETRY_LIMIT, DEFAULT_STEP_LIMIT};
use crate::error::{GenError, Result};
use crate::rng::GenRng;

/// Tunables for a generation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// RNG seed; `None` draws one from entropy
    pub seed: Option<u64>,
    /// Ceiling on controller and loop-closing steps
    pub step_limit: u32,
    /// Local re-attempts per node before escalating to its parent
    pub retry_limit: u32,
    /// Cells per grid unit
    pub chunk_size: u32,
    /// Add a left/right mirrored copy of every room to the catalogue
    pub mirror_rooms: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: None,
            step_limit: DEFAULT_STEP_LIMIT,
            retry_limit: DEFAULT_RETRY_LIMIT,
            chunk_size: CHUNK_SIZE,
            mirror_rooms: true,
        }
    }
}

impl GeneratorConfig {
    /// Parse a config from JSON text and validate it
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: GeneratorConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config from a JSON file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(GenError::InvalidConfig(
                "chunk_size must be positive".to_string(),
            ));
        }
        if self.step_limit == 0 {
            return Err(GenError::InvalidConfig(
                "step_limit must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Build the RNG this config asks for
    pub fn make_rng(&self) -> GenRng {
        match self.seed {
            Some(seed) => GenRng::new(seed),
            None => GenRng::from_entropy(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GeneratorConfig::default();
        assert_eq!(config.chunk_size, 4);
        assert_eq!(config.step_limit, 10_000);
        assert_eq!(config.retry_limit, 1);
        assert!(config.mirror_rooms);
        assert!(config.seed.is_none());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = GeneratorConfig::from_json_str(r#"{ "seed": 1, "retry_limit": 3 }"#).unwrap();
        assert_eq!(config.seed, Some(1));
        assert_eq!(config.retry_limit, 3);
        assert_eq!(config.step_limit, DEFAULT_STEP_LIMIT);
    }

    #[test]
    fn test_rejects_zero_chunk_size() {
        let err = GeneratorConfig::from_json_str(r#"{ "chunk_size": 0 }"#).unwrap_err();
        assert!(matches!(err, GenError::InvalidConfig(_)));
    }

    #[test]
    fn test_seeded_rng() {
        let config = GeneratorConfig {
            seed: Some(5),
            ..Default::default()
        };
        assert_eq!(config.make_rng().seed(), 5);
    }
}
