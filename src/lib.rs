//! cell28: deterministic, replay-verifiable micro-execution engine
//!
//! 28 compute cells advance through a six-phase control lattice. Every tick
//! masks, executes, and hashes; every cycle collapses proposals into one
//! Answer and propagates credit back. The frame log can be replayed and
//! re-hashed by an independent verifier.

pub mod core;
pub mod types;

// =============================================================================
// POPULATION [C]
// =============================================================================

/// Number of compute cells. Fixed for the engine's lifetime.
pub const CELL_COUNT: usize = 28;

/// Number of phases in the control lattice
pub const PHASE_COUNT: usize = 6;

/// Per-cell learning rate for bias updates
pub const DEFAULT_LEARNING_RATE: f64 = 0.01;

/// Bias decay applied after every credit update
pub const DEFAULT_DECAY: f64 = 0.001;

// =============================================================================
// HASHING [C]
// =============================================================================

/// Digest reported when a hash has no subject (empty evidence, no proposal)
pub const SENTINEL_HASH: &str = "h:00000000";

/// Policy hash bound to the default configuration.
/// Changing it invalidates every proof produced under the old value.
pub const DEFAULT_POLICY_HASH: &str = "policy:cell28/mask6-collapse3-reward4/v1";

/// Fractional digits kept on activation, state and signal after each execution
pub const NUMERIC_PRECISION: i32 = 6;

/// Signals below this magnitude carry no information
pub const ZERO_INFO_EPSILON: f64 = 1e-6;

// =============================================================================
// COLLAPSE WEIGHTS [C] - sum = 1.0
// =============================================================================

pub const COLLAPSE_ALPHA_SUPPORT: f64 = 0.60;
pub const COLLAPSE_BETA_COHERENCE: f64 = 0.25;
pub const COLLAPSE_GAMMA_POLICY: f64 = 0.15;

// =============================================================================
// REWARD COEFFICIENTS [C]
// =============================================================================

/// Weight of evidence support
pub const REWARD_K1_SUPPORT: f64 = 0.65;
/// Weight of constraint satisfaction
pub const REWARD_K2_CONSTRAINT: f64 = 0.25;
/// Weight of the external feedback slot (always fed 0 in this core)
pub const REWARD_K3_FEEDBACK: f64 = 0.10;
/// Penalty on incoherence
pub const REWARD_K4_INCOHERENCE: f64 = 0.35;

/// Participation weights
pub const CREDIT_EVIDENCE: f64 = 0.4;
pub const CREDIT_VETO: f64 = 0.3;
pub const CREDIT_FORMAT: f64 = 0.2;
pub const CREDIT_NOVELTY: f64 = 0.1;

// =============================================================================
// DEFAULT INPUTS
// =============================================================================

/// Default 4-token stream fed to the engine when a driver supplies none
pub const DEFAULT_TOKENS: [(&str, f64); 4] = [
    ("⟁Pop⟁", 1.0),
    ("⟁Wo⟁", 0.8),
    ("⟁Sek⟁", 0.6),
    ("⟁Ch'en⟁", 0.4),
];

// =============================================================================
// VERSION
// =============================================================================

pub const VERSION: &str = "1.0.0";
