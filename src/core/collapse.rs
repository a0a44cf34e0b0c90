//! Collapse rule: deterministic consensus over one decide tick
//!
//! Steps:
//! 1. keep verified constraints
//! 2. hash the evidence set (sorted, `|`-joined)
//! 3. drop proposals rejected by any active veto
//! 4. score = 0.60 * support + 0.25 * coherence + 0.15 * policy weight
//! 5. best score wins; ties by larger support set, smaller hash(output_hash), smaller cell id
//!
//! The Answer's proof hash covers exactly {evidenceHash, proposalHash, policyHash}.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use serde_json::json;

use crate::{COLLAPSE_ALPHA_SUPPORT, COLLAPSE_BETA_COHERENCE, COLLAPSE_GAMMA_POLICY, SENTINEL_HASH};
use crate::core::hasher::{hash_str, hash_value};
use crate::types::{Answer, Cell, Constraint, ConstraintCheck, Proposal};

/// Constraint cells with a dedicated check
pub const GATE_ENTROPY_ID: u8 = 18;
pub const GATE_WEIGHT_ID: u8 = 20;

/// Build a proposal from an executed proposal-lane cell
pub fn make_proposal(cell: &Cell, output_hash: &str, signal: f64, entropy: f64) -> Proposal {
    Proposal {
        cell_id: cell.id,
        abr_id: cell.key.to_string(),
        output_hash: output_hash.to_string(),
        content: format!("{}={:.6}", cell.key, signal),
        support: BTreeSet::from([output_hash.to_string()]),
        entropy,
        weight: cell.profile().weight,
    }
}

/// Build a constraint from an executed constraint-lane cell.
/// The signal parameterises the check; a non-positive signal leaves it unverified.
pub fn make_constraint(cell: &Cell, signal: f64) -> Constraint {
    let rule = match cell.id {
        GATE_ENTROPY_ID => ConstraintCheck::EntropyBand { max_deviation: signal },
        GATE_WEIGHT_ID => ConstraintCheck::MinWeight { floor: signal },
        _ => ConstraintCheck::NonEmpty,
    };
    Constraint {
        cell_id: cell.id,
        abr_id: cell.key.to_string(),
        veto: cell.profile().veto,
        verified: signal.is_finite() && signal > 0.0,
        rule,
    }
}

/// Hash of the sorted evidence set; the sentinel when empty
pub fn evidence_hash(evidence: &BTreeSet<String>) -> String {
    if evidence.is_empty() {
        return SENTINEL_HASH.to_string();
    }
    let joined = evidence.iter().map(String::as_str).collect::<Vec<_>>().join("|");
    hash_str(&joined)
}

/// Fraction of the proposal's support set present in the evidence set
pub fn support_fraction(proposal: &Proposal, evidence: &BTreeSet<String>) -> f64 {
    if proposal.support.is_empty() {
        return 0.0;
    }
    let present = proposal.support.iter().filter(|h| evidence.contains(*h)).count();
    present as f64 / proposal.support.len() as f64
}

pub fn coherence(entropy: f64) -> f64 {
    1.0 - (entropy - 0.5).abs().clamp(0.0, 1.0)
}

pub fn score(proposal: &Proposal, evidence: &BTreeSet<String>) -> f64 {
    COLLAPSE_ALPHA_SUPPORT * support_fraction(proposal, evidence)
        + COLLAPSE_BETA_COHERENCE * coherence(proposal.entropy)
        + COLLAPSE_GAMMA_POLICY * proposal.weight
}

/// Does the proposal survive every active veto?
pub fn is_valid(proposal: &Proposal, constraints: &[Constraint]) -> bool {
    constraints
        .iter()
        .filter(|c| c.is_active_veto())
        .all(|c| c.check(proposal))
}

/// `Less` means `a` ranks ahead of `b`
fn rank(a: &(f64, &Proposal), b: &(f64, &Proposal)) -> Ordering {
    b.0.total_cmp(&a.0)
        .then_with(|| b.1.support.len().cmp(&a.1.support.len()))
        .then_with(|| hash_str(&a.1.output_hash).cmp(&hash_str(&b.1.output_hash)))
        .then_with(|| a.1.cell_id.cmp(&b.1.cell_id))
}

/// Pick the winning proposal, or None when nothing survives the vetoes
pub fn select_proposal<'a>(
    proposals: &'a [Proposal],
    constraints: &[Constraint],
    evidence: &BTreeSet<String>,
) -> Option<&'a Proposal> {
    let verified: Vec<Constraint> = constraints.iter().filter(|c| c.verified).cloned().collect();

    proposals
        .iter()
        .filter(|p| is_valid(p, &verified))
        .map(|p| (score(p, evidence), p))
        .min_by(rank)
        .map(|(_, p)| p)
}

/// Proof hash of an answer
pub fn answer_proof_hash(evidence_hash: &str, proposal_hash: &str, policy_hash: &str) -> String {
    hash_value(&json!({
        "evidenceHash": evidence_hash,
        "proposalHash": proposal_hash,
        "policyHash": policy_hash,
    }))
}

/// Run the collapse and emit the Answer
pub fn collapse(
    tick: u64,
    proposals: &[Proposal],
    constraints: &[Constraint],
    evidence: &BTreeSet<String>,
    policy_hash: &str,
) -> Answer {
    let evidence_hash = evidence_hash(evidence);
    let selected = select_proposal(proposals, constraints, evidence);

    tracing::debug!(
        tick,
        proposals = proposals.len(),
        constraints = constraints.len(),
        selected = ?selected.map(|p| p.cell_id),
        "collapse"
    );

    let (proposal_hash, content, cell_id) = match selected {
        Some(p) => (p.output_hash.clone(), Some(p.content.clone()), Some(p.cell_id)),
        None => (SENTINEL_HASH.to_string(), None, None),
    };
    let proof_hash = answer_proof_hash(&evidence_hash, &proposal_hash, policy_hash);

    Answer {
        tick,
        evidence_hash,
        proposal_hash,
        policy_hash: policy_hash.to_string(),
        content,
        cell_id,
        proof_hash,
    }
}

// =============================================================================
// TESTS
// =============================================================================
