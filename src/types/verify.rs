//! Verification stages, reports and audit warnings

use serde::{Deserialize, Serialize};

/// Verifier stages, run in order. The first failing stage halts verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[allow(non_camel_case_types)]
pub enum VerifyStage {
    /// Log must not be empty
    S0_NON_EMPTY,
    /// Header present (warning only)
    S1_HEADER,
    /// Tick strictly increasing across mask frames
    S2_TICK_MONOTONIC,
    /// Every mask reason is a known code
    S3_MASK_REASONS,
    /// Every proof event re-hashes to its proof hash
    S4_PROOF_HASH,
    /// Phase never regresses across proof events
    S5_PHASE_ORDER,
    /// Every answer re-hashes to its proof hash
    S6_ANSWER_HASH,
    /// Every reward record re-hashes to its proof hash
    S7_REWARD_HASH,
    /// All stages passed
    S8_OK,
}

impl VerifyStage {
    pub fn code(&self) -> &'static str {
        match self {
            Self::S0_NON_EMPTY => "S0",
            Self::S1_HEADER => "S1",
            Self::S2_TICK_MONOTONIC => "S2",
            Self::S3_MASK_REASONS => "S3",
            Self::S4_PROOF_HASH => "S4",
            Self::S5_PHASE_ORDER => "S5",
            Self::S6_ANSWER_HASH => "S6",
            Self::S7_REWARD_HASH => "S7",
            Self::S8_OK => "S8",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::S0_NON_EMPTY => "Frame log is empty",
            Self::S1_HEADER => "Header frame missing",
            Self::S2_TICK_MONOTONIC => "Tick not strictly increasing across mask frames",
            Self::S3_MASK_REASONS => "Unknown mask reason code",
            Self::S4_PROOF_HASH => "Proof event hash mismatch",
            Self::S5_PHASE_ORDER => "Phase regressed across proof events",
            Self::S6_ANSWER_HASH => "Answer hash mismatch",
            Self::S7_REWARD_HASH => "Reward record hash mismatch",
            Self::S8_OK => "Verification passed",
        }
    }
}

impl std::fmt::Display for VerifyStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.description())
    }
}

/// Non-fatal findings collected during verification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditWarning {
    /// The log does not open with a header frame
    MissingHeader,
    /// A cell repeated an identical (inputs, outputs) pair and should have been masked
    Fixpoint {
        cell_id: u8,
        first_tick: u64,
        repeat_tick: u64,
        inputs_hash: String,
        outputs_hash: String,
    },
}

/// Result of a successful verification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifyReport {
    pub stage: VerifyStage,
    pub frames: usize,
    pub proofs: usize,
    pub answers: usize,
    pub rewards: usize,
    pub last_proof_hash: String,
    pub warnings: Vec<AuditWarning>,
}

/// First failing stage, with the last hash that did verify
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{stage} at frame {frame_index}: {detail} (last valid proof {last_valid_proof})")]
pub struct VerifyFailure {
    pub stage: VerifyStage,
    pub frame_index: usize,
    pub last_valid_proof: String,
    pub detail: String,
}
