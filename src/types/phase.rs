//! Phase definitions for the control lattice

use serde::{Deserialize, Serialize};

/// The six phases of the control lattice, in lattice order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Sensors read the token stream
    Perceive,
    /// Encoders project what was perceived
    Represent,
    /// Reasoners and early proposers run
    Reason,
    /// Proposals and constraints meet; collapse on exit
    Decide,
    /// Post-collapse, SAFE cells only
    Act,
    /// Post-collapse, SAFE cells only; reward on exit
    Reflect,
}

impl Phase {
    /// All phases in lattice order
    pub const ALL: [Phase; 6] = [
        Phase::Perceive,
        Phase::Represent,
        Phase::Reason,
        Phase::Decide,
        Phase::Act,
        Phase::Reflect,
    ];

    /// Position in the lattice (0..6)
    pub fn index(&self) -> u8 {
        match self {
            Phase::Perceive => 0,
            Phase::Represent => 1,
            Phase::Reason => 2,
            Phase::Decide => 3,
            Phase::Act => 4,
            Phase::Reflect => 5,
        }
    }

    /// Phase at a lattice position
    pub fn from_index(index: u8) -> Option<Phase> {
        Self::ALL.get(index as usize).copied()
    }

    /// Wire name, also used inside hashed records
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Perceive => "perceive",
            Phase::Represent => "represent",
            Phase::Reason => "reason",
            Phase::Decide => "decide",
            Phase::Act => "act",
            Phase::Reflect => "reflect",
        }
    }

    /// Is this a post-collapse phase?
    pub fn is_post_collapse(&self) -> bool {
        matches!(self, Phase::Act | Phase::Reflect)
    }

    /// Get ANSI color code for terminal display
    pub fn color_code(&self) -> &'static str {
        match self {
            Phase::Perceive => "\x1b[36m",  // Cyan
            Phase::Represent => "\x1b[34m", // Blue
            Phase::Reason => "\x1b[35m",    // Magenta
            Phase::Decide => "\x1b[33m",    // Yellow
            Phase::Act => "\x1b[32m",       // Green
            Phase::Reflect => "\x1b[90m",   // Gray
        }
    }

    /// Reset ANSI color
    pub fn color_reset() -> &'static str {
        "\x1b[0m"
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name().to_uppercase())
    }
}
