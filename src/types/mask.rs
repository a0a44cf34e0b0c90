//! Mask reason codes and per-tick mask decisions

use serde::{Deserialize, Serialize};
use crate::types::Phase;

/// Why a cell was masked. Rules are evaluated in this order; the first match wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(non_camel_case_types)]
pub enum MaskReason {
    /// Post-collapse barrier: only SAFE cells run in act/reflect
    M1_COLLAPSE_LOCKED,
    /// Domain not admitted by the current phase
    M2_DOMAIN_INACTIVE,
    /// Lane not admitted by the current phase
    M3_LANE_BLOCKED,
    /// Previous signal carried no information
    M4_ZERO_INFO_GAIN,
    /// Mandatory per-id policy denied execution
    M5_POLICY_DENY,
}

impl MaskReason {
    pub const ALL: [MaskReason; 5] = [
        MaskReason::M1_COLLAPSE_LOCKED,
        MaskReason::M2_DOMAIN_INACTIVE,
        MaskReason::M3_LANE_BLOCKED,
        MaskReason::M4_ZERO_INFO_GAIN,
        MaskReason::M5_POLICY_DENY,
    ];

    /// Wire code, as written into mask frames
    pub fn code(&self) -> &'static str {
        match self {
            Self::M1_COLLAPSE_LOCKED => "collapse-locked",
            Self::M2_DOMAIN_INACTIVE => "domain-inactive",
            Self::M3_LANE_BLOCKED => "lane-blocked",
            Self::M4_ZERO_INFO_GAIN => "zero-info-gain",
            Self::M5_POLICY_DENY => "policy-deny",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::M1_COLLAPSE_LOCKED => "Non-SAFE cell behind the collapse barrier",
            Self::M2_DOMAIN_INACTIVE => "Domain not permitted in this phase",
            Self::M3_LANE_BLOCKED => "Lane not permitted in this phase",
            Self::M4_ZERO_INFO_GAIN => "Last signal below information threshold",
            Self::M5_POLICY_DENY => "Mandatory per-id policy denied execution",
        }
    }

    /// Compact byte used in the binary dump
    pub fn as_byte(&self) -> u8 {
        match self {
            Self::M1_COLLAPSE_LOCKED => 1,
            Self::M2_DOMAIN_INACTIVE => 2,
            Self::M3_LANE_BLOCKED => 3,
            Self::M4_ZERO_INFO_GAIN => 4,
            Self::M5_POLICY_DENY => 5,
        }
    }

    /// Bit this reason occupies in a dump record's reason set
    pub fn set_bit(&self) -> u8 {
        1 << (self.as_byte() - 1)
    }

    /// Parse a wire code; unknown codes yield None
    pub fn from_code(code: &str) -> Option<MaskReason> {
        Self::ALL.iter().copied().find(|r| r.code() == code)
    }
}

impl std::fmt::Display for MaskReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.description())
    }
}

/// Outcome of the masking law for one cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskDecision {
    Eligible,
    Masked(MaskReason),
}

impl MaskDecision {
    pub fn is_eligible(&self) -> bool {
        matches!(self, MaskDecision::Eligible)
    }

    pub fn reason(&self) -> Option<MaskReason> {
        match self {
            MaskDecision::Eligible => None,
            MaskDecision::Masked(reason) => Some(*reason),
        }
    }
}

/// A masked cell as reported in a mask frame.
/// The reason is kept as its wire code so a replayed log can carry unknown codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskEntry {
    pub cell_id: u8,
    pub reason: String,
}

/// Masking law output for a whole tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskSet {
    pub tick: u64,
    pub phase: Phase,
    /// 28-bit eligibility mask; bit i set means cell i runs
    pub bits: u32,
    pub decisions: Vec<MaskDecision>,
}

impl MaskSet {
    pub fn is_eligible(&self, cell_id: u8) -> bool {
        self.bits & (1 << cell_id) != 0
    }

    pub fn eligible_count(&self) -> u32 {
        self.bits.count_ones()
    }

    /// Masked cells in id order
    pub fn entries(&self) -> Vec<MaskEntry> {
        self.decisions
            .iter()
            .enumerate()
            .filter_map(|(id, d)| {
                d.reason().map(|reason| MaskEntry {
                    cell_id: id as u8,
                    reason: reason.code().to_string(),
                })
            })
            .collect()
    }
}
