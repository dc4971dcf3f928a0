//! Configuration for ingestion and question answering.

use serde::{Deserialize, Serialize};

use crate::chunking::DEFAULT_LOOKBACK;
use crate::error::{PolicyError, Result};

/// Configuration parameters shared by ingestion and the answer engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PolicyConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// How far the chunker walks back looking for whitespace.
    pub chunk_lookback: usize,
    /// First-pass retrieval distance threshold.
    pub tight_distance: f32,
    /// Retry threshold used when the first pass finds nothing.
    pub loose_distance: f32,
    /// Chunk limit used when a question asks for zero chunks.
    pub default_max_chunks: usize,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1500,
            chunk_lookback: DEFAULT_LOOKBACK,
            tight_distance: 0.35,
            loose_distance: 0.38,
            default_max_chunks: 5,
        }
    }
}

impl PolicyConfig {
    /// Create a new builder for constructing a [`PolicyConfig`].
    pub fn builder() -> PolicyConfigBuilder {
        PolicyConfigBuilder::default()
    }

    /// Check that the parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::Config`] if:
    /// - `chunk_size == 0`
    /// - `default_max_chunks == 0`
    /// - either threshold is negative or not finite
    /// - `loose_distance < tight_distance`
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(PolicyError::Config("chunk_size must be greater than zero".to_string()));
        }
        if self.default_max_chunks == 0 {
            return Err(PolicyError::Config(
                "default_max_chunks must be greater than zero".to_string(),
            ));
        }
        for (name, value) in
            [("tight_distance", self.tight_distance), ("loose_distance", self.loose_distance)]
        {
            if !value.is_finite() || value < 0.0 {
                return Err(PolicyError::Config(format!(
                    "{name} ({value}) must be a finite, non-negative distance"
                )));
            }
        }
        if self.loose_distance < self.tight_distance {
            return Err(PolicyError::Config(format!(
                "loose_distance ({}) must not be tighter than tight_distance ({})",
                self.loose_distance, self.tight_distance
            )));
        }
        Ok(())
    }
}

/// Builder for constructing a validated [`PolicyConfig`].
#[derive(Debug, Clone, Default)]
pub struct PolicyConfigBuilder {
    config: PolicyConfig,
}

impl PolicyConfigBuilder {
    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the whitespace look-back window in characters.
    pub fn chunk_lookback(mut self, lookback: usize) -> Self {
        self.config.chunk_lookback = lookback;
        self
    }

    /// Set the first-pass retrieval distance threshold.
    pub fn tight_distance(mut self, distance: f32) -> Self {
        self.config.tight_distance = distance;
        self
    }

    /// Set the retry retrieval distance threshold.
    pub fn loose_distance(mut self, distance: f32) -> Self {
        self.config.loose_distance = distance;
        self
    }

    /// Set the chunk limit used when a question does not specify one.
    pub fn default_max_chunks(mut self, max_chunks: usize) -> Self {
        self.config.default_max_chunks = max_chunks;
        self
    }

    /// Build the [`PolicyConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// See [`PolicyConfig::validate`].
    pub fn build(self) -> Result<PolicyConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(PolicyConfig::default().validate().is_ok());
        assert_eq!(PolicyConfig::builder().build().unwrap(), PolicyConfig::default());
    }

    #[test]
    fn rejects_inverted_thresholds() {
        let err = PolicyConfig::builder().tight_distance(0.5).loose_distance(0.4).build();
        assert!(matches!(err, Err(PolicyError::Config(_))));
    }

    #[test]
    fn rejects_zero_sizes_and_bad_distances() {
        assert!(PolicyConfig::builder().chunk_size(0).build().is_err());
        assert!(PolicyConfig::builder().default_max_chunks(0).build().is_err());
        assert!(PolicyConfig::builder().tight_distance(-0.1).build().is_err());
        assert!(PolicyConfig::builder().loose_distance(f32::NAN).build().is_err());
    }

    #[test]
    fn deserializes_partial_config() {
        let config: PolicyConfig = serde_json::from_str(r#"{"chunk_size": 800}"#).unwrap();
        assert_eq!(config.chunk_size, 800);
        assert_eq!(config.loose_distance, 0.38);
    }
}
