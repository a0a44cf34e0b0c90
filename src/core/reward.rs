//! Reward propagation: once-per-cycle credit assignment at reflect exit
//!
//! reward = k1 * support - k4 * incoherence + k2 * constraintSatisfied + k3 * feedback
//!
//! Credits are normalised participation weights times the reward. Each
//! participant's bias moves by `lr * credit`, then decays by `(1 - decay)`.

use std::collections::BTreeSet;
use serde_json::{json, Value};

use crate::{
    CREDIT_EVIDENCE, CREDIT_FORMAT, CREDIT_NOVELTY, CREDIT_VETO,
    REWARD_K1_SUPPORT, REWARD_K2_CONSTRAINT, REWARD_K3_FEEDBACK, REWARD_K4_INCOHERENCE,
};
use crate::core::hasher::{hash_value, is_sentinel, num};
use crate::types::{Answer, Cell, CellCredit, RewardRecord, Role};

/// External feedback slot. This core has no feedback source.
const FEEDBACK_PLACEHOLDER: f64 = 0.0;

/// Scalar reward for a cycle's answer
pub fn reward_value(answer: &Answer, entropy: f64) -> f64 {
    let support = if is_sentinel(&answer.evidence_hash) { 0.0 } else { 0.5 };
    let constraint_satisfied = if answer.content.is_some() { 1.0 } else { 0.0 };
    let incoherence = (entropy - 0.5).abs() * 0.5;

    REWARD_K1_SUPPORT * support - REWARD_K4_INCOHERENCE * incoherence
        + REWARD_K2_CONSTRAINT * constraint_satisfied
        + REWARD_K3_FEEDBACK * FEEDBACK_PLACEHOLDER
}

/// Raw participation weight of one executed cell
pub fn participation_weight(cell: &Cell, evidence: &BTreeSet<String>) -> f64 {
    let profile = cell.profile();
    let mut weight = 0.0;

    if cell
        .last_output_hash
        .as_ref()
        .is_some_and(|h| evidence.contains(h))
    {
        weight += CREDIT_EVIDENCE;
    }
    if profile.role == Role::Constraint && profile.veto {
        weight += CREDIT_VETO;
    }
    if profile.role == Role::Format {
        weight += CREDIT_FORMAT;
    }
    // novelty: any nonzero signal
    weight + CREDIT_NOVELTY
}

/// Hash of the id-sorted `(id, credit)` list
pub fn credits_hash(credits: &[CellCredit]) -> String {
    let pairs: Vec<Value> = credits
        .iter()
        .map(|c| json!([c.cell_id, num(c.credit)]))
        .collect();
    hash_value(&Value::Array(pairs))
}

/// Proof hash of a reward record
pub fn reward_proof_hash(reward: f64, credits_hash: &str, policy_hash: &str) -> String {
    hash_value(&json!({
        "reward": num(reward),
        "creditsHash": credits_hash,
        "policyHash": policy_hash,
    }))
}

/// Assign credit to this tick's participants and update their bias.
///
/// Participants are the cells in `executed` whose last signal is nonzero.
#[allow(clippy::too_many_arguments)]
pub fn propagate(
    tick: u64,
    answer: &Answer,
    entropy: f64,
    executed: &[u8],
    cells: &mut [Cell],
    evidence: &BTreeSet<String>,
    decay: f64,
    policy_hash: &str,
) -> RewardRecord {
    let reward = reward_value(answer, entropy);

    let mut ids: Vec<u8> = executed
        .iter()
        .copied()
        .filter(|id| cells[*id as usize].last_signal != 0.0)
        .collect();
    ids.sort_unstable();
    ids.dedup();

    let weights: Vec<(u8, f64)> = ids
        .iter()
        .map(|id| (*id, participation_weight(&cells[*id as usize], evidence)))
        .collect();
    let total: f64 = weights.iter().map(|(_, w)| w).sum();

    let mut credits = Vec::with_capacity(weights.len());
    if total > 0.0 {
        for (id, weight) in weights {
            let credit = weight / total * reward;
            let cell = &mut cells[id as usize];
            cell.bias += cell.lr * credit;
            cell.bias *= 1.0 - decay;
            credits.push(CellCredit { cell_id: id, credit });
        }
    }

    let credits_hash = credits_hash(&credits);
    let proof_hash = reward_proof_hash(reward, &credits_hash, policy_hash);

    tracing::info!(tick, reward, participants = credits.len(), "reward propagated");

    RewardRecord {
        tick,
        reward,
        credits,
        credits_hash,
        evidence_hash: answer.evidence_hash.clone(),
        proposal_hash: answer.proposal_hash.clone(),
        policy_hash: policy_hash.to_string(),
        proof_hash,
    }
}

// =============================================================================
// TESTS
// =============================================================================
