//! Engine configuration
//!
//! Loaded from JSON. Every field has a default, so `{}` is a valid config.

use std::path::Path;
use serde::{Deserialize, Serialize};

use crate::{DEFAULT_DECAY, DEFAULT_LEARNING_RATE, DEFAULT_POLICY_HASH};
use crate::core::registry::{default_profile_table, validate_profile_table};
use crate::types::{EngineError, ProfileEntry};

/// Parameters bound to an engine instance at construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Opaque policy identifier, folded into every proof
    pub policy_hash: String,
    pub cluster_id: u32,
    pub cluster_count: u32,
    pub learning_rate: f64,
    pub decay: f64,
    /// Profile table override; the built-in table when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profiles: Option<Vec<ProfileEntry>>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            policy_hash: DEFAULT_POLICY_HASH.to_string(),
            cluster_id: 0,
            cluster_count: 1,
            learning_rate: DEFAULT_LEARNING_RATE,
            decay: DEFAULT_DECAY,
            profiles: None,
        }
    }
}

impl EngineConfig {
    /// Default config for a given cluster
    pub fn for_cluster(cluster_id: u32, cluster_count: u32) -> Self {
        Self {
            cluster_id,
            cluster_count,
            ..Self::default()
        }
    }

    /// Read and validate a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Parse and validate a JSON config
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// The profile table this config resolves to
    pub fn profile_table(&self) -> Vec<ProfileEntry> {
        self.profiles.clone().unwrap_or_else(default_profile_table)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.policy_hash.is_empty() {
            return Err(EngineError::Config("policy hash is empty".to_string()));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(EngineError::Config(format!(
                "learning rate {} must be positive",
                self.learning_rate
            )));
        }
        if !self.decay.is_finite() || !(0.0..1.0).contains(&self.decay) {
            return Err(EngineError::Config(format!(
                "decay {} outside [0, 1)",
                self.decay
            )));
        }
        if let Some(profiles) = &self.profiles {
            validate_profile_table(profiles)?;
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
