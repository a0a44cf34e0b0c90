//! Proof records for executed cells
//!
//! Contract:
//! - inputsHash  = hash of what the kernel could read (global inputs + the cell's own state)
//! - outputsHash = hash of what the execution produced
//! - proofHash   = hash({inputsHash, outputsHash, policyHash}); nothing else may influence it
//!
//! The tick is absent from inputsHash. A cell seeing the same world twice
//! produces the same pair, which the verifier audits as a fixpoint.

use serde_json::{json, Value};

use crate::core::hasher::{hash_value, num};
use crate::types::{Cell, GlobalState, ProofEvent, Token};

/// Hash of the token stream, computed once per tick
pub fn tokens_hash(tokens: &[Token]) -> String {
    let items: Vec<Value> = tokens
        .iter()
        .map(|t| json!({"glyph": t.glyph, "weight": num(t.weight)}))
        .collect();
    hash_value(&Value::Array(items))
}

/// Hash of a cell's inputs, taken before its kernel runs
pub fn inputs_hash(cell: &Cell, global: &GlobalState, tokens_hash: &str) -> String {
    hash_value(&json!({
        "cellId": cell.id,
        "kernelId": cell.kernel_id(),
        "phase": global.phase.name(),
        "entropy": num(global.entropy),
        "rewardBias": num(global.reward_bias),
        "clusterId": global.cluster_id,
        "clusterCount": global.cluster_count,
        "tokensHash": tokens_hash,
        "activation": num(cell.activation),
        "state": num(cell.state),
        "bias": num(cell.bias),
    }))
}

/// Hash of a cell's outputs, taken after its kernel ran
pub fn outputs_hash(cell: &Cell, signal: f64) -> String {
    hash_value(&json!({
        "cellId": cell.id,
        "signal": num(signal),
        "activation": num(cell.activation),
        "state": num(cell.state),
    }))
}

/// The locked 3-field proof hash
pub fn event_proof_hash(inputs_hash: &str, outputs_hash: &str, policy_hash: &str) -> String {
    hash_value(&json!({
        "inputsHash": inputs_hash,
        "outputsHash": outputs_hash,
        "policyHash": policy_hash,
    }))
}

/// Assemble the proof event for an executed cell
pub fn make_event(
    global: &GlobalState,
    cell: &Cell,
    signal: f64,
    inputs_hash: String,
    outputs_hash: String,
    policy_hash: &str,
) -> ProofEvent {
    let proof_hash = event_proof_hash(&inputs_hash, &outputs_hash, policy_hash);
    ProofEvent {
        tick: global.tick,
        phase: global.phase,
        cell_id: cell.id,
        kernel_id: cell.kernel_id(),
        domain: cell.profile().domain,
        lane: cell.profile().lane,
        signal,
        activation: cell.activation,
        state: cell.state,
        inputs_hash,
        outputs_hash,
        policy_hash: policy_hash.to_string(),
        proof_hash,
    }
}

// =============================================================================
// TESTS
// =============================================================================
