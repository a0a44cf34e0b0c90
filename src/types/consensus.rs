//! Proposal, constraint, answer and reward records

use std::collections::BTreeSet;
use serde::{Deserialize, Serialize};

/// A candidate answer from a proposal-lane cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub cell_id: u8,
    pub abr_id: String,
    pub output_hash: String,
    pub content: String,
    /// Hashes this proposal claims as support; `{output_hash}` for cell proposals
    pub support: BTreeSet<String>,
    /// Entropy at the tick the proposal was made
    pub entropy: f64,
    /// The proposing cell's static profile weight
    pub weight: f64,
}

/// The predicate a constraint applies to a proposal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConstraintCheck {
    /// Passes when `|entropy - 0.5| <= max_deviation`
    EntropyBand { max_deviation: f64 },
    /// Passes when the proposing cell's weight is at least `floor`
    MinWeight { floor: f64 },
    /// Passes when the proposal has content
    NonEmpty,
}

impl ConstraintCheck {
    pub fn passes(&self, proposal: &Proposal) -> bool {
        match self {
            ConstraintCheck::EntropyBand { max_deviation } => {
                (proposal.entropy - 0.5).abs() <= *max_deviation
            }
            ConstraintCheck::MinWeight { floor } => proposal.weight >= *floor,
            ConstraintCheck::NonEmpty => !proposal.content.is_empty(),
        }
    }
}

/// A constraint record from a constraint-lane cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub cell_id: u8,
    pub abr_id: String,
    pub veto: bool,
    pub verified: bool,
    pub rule: ConstraintCheck,
}

impl Constraint {
    pub fn check(&self, proposal: &Proposal) -> bool {
        self.rule.passes(proposal)
    }

    /// Only verified veto constraints filter proposals
    pub fn is_active_veto(&self) -> bool {
        self.veto && self.verified
    }
}

/// The canonical answer of a cycle, produced at decide-phase exit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub tick: u64,
    pub evidence_hash: String,
    pub proposal_hash: String,
    pub policy_hash: String,
    /// None when no proposal survived
    pub content: Option<String>,
    /// Winning cell, if any
    pub cell_id: Option<u8>,
    pub proof_hash: String,
}

/// Credit assigned to one participating cell
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CellCredit {
    pub cell_id: u8,
    pub credit: f64,
}

/// Credit-assignment record, produced at reflect-phase exit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardRecord {
    pub tick: u64,
    pub reward: f64,
    /// Id-sorted credits; empty when nobody participated
    pub credits: Vec<CellCredit>,
    pub credits_hash: String,
    pub evidence_hash: String,
    pub proposal_hash: String,
    pub policy_hash: String,
    pub proof_hash: String,
}

impl RewardRecord {
    pub fn credit_total(&self) -> f64 {
        self.credits.iter().map(|c| c.credit).sum()
    }
}
