//! Per-tick inputs and the global tick state

use serde::{Deserialize, Serialize};
use crate::DEFAULT_TOKENS;
use crate::types::{EngineError, Phase};

/// One weighted glyph of the token stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub glyph: String,
    pub weight: f64,
}

impl Token {
    pub fn new(glyph: &str, weight: f64) -> Self {
        Self {
            glyph: glyph.to_string(),
            weight,
        }
    }
}

/// The default 4-token stream
pub fn default_tokens() -> Vec<Token> {
    DEFAULT_TOKENS
        .iter()
        .map(|(glyph, weight)| Token::new(glyph, *weight))
        .collect()
}

/// Inputs supplied by the external driver before each tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickInput {
    pub entropy: f64,
    #[serde(default)]
    pub reward_bias: f64,
    #[serde(default = "default_tokens")]
    pub tokens: Vec<Token>,
    pub cluster_id: u32,
    #[serde(default = "default_cluster_count")]
    pub cluster_count: u32,
}

fn default_cluster_count() -> u32 {
    1
}

impl TickInput {
    /// Input with the default token stream and a single cluster
    pub fn new(entropy: f64, reward_bias: f64, cluster_id: u32) -> Self {
        Self {
            entropy,
            reward_bias,
            tokens: default_tokens(),
            cluster_id,
            cluster_count: 1,
        }
    }

    pub fn with_tokens(mut self, tokens: Vec<Token>) -> Self {
        self.tokens = tokens;
        self
    }

    pub fn with_cluster_count(mut self, cluster_count: u32) -> Self {
        self.cluster_count = cluster_count;
        self
    }

    /// Reject non-finite driver values before they reach the kernels
    pub fn validate(&self) -> Result<(), EngineError> {
        if !self.entropy.is_finite() {
            return Err(EngineError::Input(format!("entropy {} is not finite", self.entropy)));
        }
        if !self.reward_bias.is_finite() {
            return Err(EngineError::Input(format!(
                "reward bias {} is not finite",
                self.reward_bias
            )));
        }
        if let Some(token) = self.tokens.iter().find(|t| !t.weight.is_finite()) {
            return Err(EngineError::Input(format!(
                "token {:?} has non-finite weight {}",
                token.glyph, token.weight
            )));
        }
        Ok(())
    }
}

/// Global tick state, mutated once per tick before kernel execution
#[derive(Debug, Clone, Serialize)]
pub struct GlobalState {
    pub tick: u64,
    pub phase: Phase,
    pub entropy: f64,
    pub reward_bias: f64,
    pub cluster_id: u32,
    pub cluster_count: u32,
    pub tokens: Vec<Token>,
}

impl GlobalState {
    pub fn new(cluster_id: u32, cluster_count: u32) -> Self {
        Self {
            tick: 0,
            phase: Phase::Perceive,
            entropy: 0.0,
            reward_bias: 0.0,
            cluster_id,
            cluster_count,
            tokens: default_tokens(),
        }
    }

    /// Apply driver inputs. Tick and phase are owned by the engine.
    pub fn apply(&mut self, input: &TickInput) {
        self.entropy = input.entropy;
        self.reward_bias = input.reward_bias;
        self.tokens = input.tokens.clone();
        self.cluster_id = input.cluster_id;
        self.cluster_count = input.cluster_count;
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    pub fn token_sum(&self) -> f64 {
        self.tokens.iter().map(|t| t.weight).sum()
    }

    /// Mean token weight; 0 for an empty stream
    pub fn token_mean(&self) -> f64 {
        if self.tokens.is_empty() {
            return 0.0;
        }
        self.token_sum() / self.tokens.len() as f64
    }

    /// Population variance of token weights; 0 for an empty stream
    pub fn token_variance(&self) -> f64 {
        if self.tokens.is_empty() {
            return 0.0;
        }
        let mean = self.token_mean();
        self.tokens
            .iter()
            .map(|t| (t.weight - mean).powi(2))
            .sum::<f64>()
            / self.tokens.len() as f64
    }

    /// `1 - clamp01(|entropy - 0.5|)`
    pub fn coherence(&self) -> f64 {
        1.0 - (self.entropy - 0.5).abs().clamp(0.0, 1.0)
    }
}
