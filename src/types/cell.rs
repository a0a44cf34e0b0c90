//! Cell profiles and mutable per-cell state

use serde::{Deserialize, Serialize};

/// Functional role of a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Sensor,
    Encoder,
    Reasoner,
    Proposer,
    Constraint,
    Format,
    Memory,
    Control,
}

/// Execution domain. Phases admit domains through a fixed allowlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Domain {
    Perception,
    Representation,
    Reasoning,
    Decision,
    Memory,
    /// The only domain allowed past the collapse barrier
    Safe,
}

impl Domain {
    pub fn name(&self) -> &'static str {
        match self {
            Domain::Perception => "PERCEPTION",
            Domain::Representation => "REPRESENTATION",
            Domain::Reasoning => "REASONING",
            Domain::Decision => "DECISION",
            Domain::Memory => "MEMORY",
            Domain::Safe => "SAFE",
        }
    }
}

/// Output lane. Decides how a cell's output is classified after execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lane {
    Evidence,
    Proposal,
    Constraint,
    Control,
}

impl Lane {
    pub fn name(&self) -> &'static str {
        match self {
            Lane::Evidence => "evidence",
            Lane::Proposal => "proposal",
            Lane::Constraint => "constraint",
            Lane::Control => "control",
        }
    }
}

/// Immutable profile bound to a cell at construction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CellProfile {
    pub role: Role,
    pub domain: Domain,
    pub lane: Lane,
    /// Static policy weight in [0, 1]
    pub weight: f64,
    /// Constraint cells with veto may reject proposals outright
    pub veto: bool,
}

/// One entry of a profile table, as loaded from configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileEntry {
    pub id: u8,
    pub key: String,
    #[serde(flatten)]
    pub profile: CellProfile,
}

/// A compute cell. The profile is private so it cannot change after construction.
#[derive(Debug, Clone, Serialize)]
pub struct Cell {
    pub id: u8,
    pub key: &'static str,
    profile: CellProfile,
    /// Accumulated signal over un-masked executions
    pub activation: f64,
    /// Written only by the store, reward-integrate and persist kernels
    pub state: f64,
    /// Learned bias, updated by reward propagation
    pub bias: f64,
    pub lr: f64,
    pub last_signal: f64,
    pub last_output_hash: Option<String>,
}

impl Cell {
    /// Create a cell bound to its profile.
    ///
    /// `last_signal` starts at 1.0: a cell that has never run has not yet
    /// shown a flat output, so the zero-information gate leaves it alone.
    pub fn new(id: u8, key: &'static str, profile: CellProfile, lr: f64) -> Self {
        Self {
            id,
            key,
            profile,
            activation: 0.0,
            state: 0.0,
            bias: 0.0,
            lr,
            last_signal: 1.0,
            last_output_hash: None,
        }
    }

    pub fn profile(&self) -> &CellProfile {
        &self.profile
    }

    /// Kernel id equals cell id
    pub fn kernel_id(&self) -> u8 {
        self.id
    }
}
