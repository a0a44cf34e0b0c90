//! Cell registry: the fixed population of 28 cells and their profile table

use crate::CELL_COUNT;
use crate::core::kernels::KERNELS;
use crate::types::{Cell, CellProfile, Domain, EngineError, Lane, ProfileEntry, Role};

const fn profile(role: Role, domain: Domain, lane: Lane, weight: f64, veto: bool) -> CellProfile {
    CellProfile {
        role,
        domain,
        lane,
        weight,
        veto,
    }
}

use Domain::{Decision, Memory, Perception, Reasoning, Representation, Safe};

/// Default profile table, indexed by cell id
pub const DEFAULT_PROFILES: [CellProfile; CELL_COUNT] = [
    // 0-4: sensors
    profile(Role::Sensor, Perception, Lane::Evidence, 0.50, false),
    profile(Role::Sensor, Perception, Lane::Evidence, 0.45, false),
    profile(Role::Sensor, Perception, Lane::Evidence, 0.40, false),
    profile(Role::Sensor, Perception, Lane::Evidence, 0.55, false),
    profile(Role::Sensor, Perception, Lane::Evidence, 0.35, false),
    // 5-8: encoders
    profile(Role::Encoder, Representation, Lane::Evidence, 0.50, false),
    profile(Role::Encoder, Representation, Lane::Evidence, 0.40, false),
    profile(Role::Encoder, Representation, Lane::Evidence, 0.30, false),
    profile(Role::Encoder, Representation, Lane::Evidence, 0.45, false),
    // 9-11: memory
    profile(Role::Memory, Memory, Lane::Evidence, 0.35, false),
    profile(Role::Memory, Memory, Lane::Evidence, 0.30, false),
    profile(Role::Memory, Memory, Lane::Evidence, 0.40, false),
    // 12-15: reasoning
    profile(Role::Reasoner, Reasoning, Lane::Evidence, 0.55, false),
    profile(Role::Reasoner, Reasoning, Lane::Evidence, 0.50, false),
    profile(Role::Reasoner, Reasoning, Lane::Proposal, 0.60, false),
    profile(Role::Proposer, Reasoning, Lane::Proposal, 0.65, false),
    // 16-18: decision
    profile(Role::Proposer, Decision, Lane::Proposal, 0.70, false),
    profile(Role::Proposer, Decision, Lane::Proposal, 0.75, false),
    profile(Role::Constraint, Decision, Lane::Constraint, 0.80, true),
    // 19-23: safe
    profile(Role::Memory, Safe, Lane::Evidence, 0.30, false),
    profile(Role::Constraint, Safe, Lane::Constraint, 0.85, true),
    profile(Role::Format, Safe, Lane::Evidence, 0.45, false),
    profile(Role::Memory, Safe, Lane::Evidence, 0.35, false),
    profile(Role::Constraint, Safe, Lane::Constraint, 0.60, false),
    // 24-27: control
    profile(Role::Control, Safe, Lane::Control, 1.00, false),
    profile(Role::Control, Safe, Lane::Control, 0.50, false),
    profile(Role::Control, Safe, Lane::Control, 0.20, false),
    profile(Role::Format, Safe, Lane::Evidence, 0.40, false),
];

/// Default profile of one cell; None outside 0..28
pub fn default_profile(id: u8) -> Option<CellProfile> {
    DEFAULT_PROFILES.get(id as usize).copied()
}

/// Default table in its configuration form
pub fn default_profile_table() -> Vec<ProfileEntry> {
    DEFAULT_PROFILES
        .iter()
        .enumerate()
        .map(|(id, profile)| ProfileEntry {
            id: id as u8,
            key: KERNELS[id].key.to_string(),
            profile: *profile,
        })
        .collect()
}

/// Check a profile table: 28 entries, ids in order, keys bound to the right kernel, weights in [0, 1]
pub fn validate_profile_table(entries: &[ProfileEntry]) -> Result<(), EngineError> {
    if entries.len() != CELL_COUNT {
        return Err(EngineError::Config(format!(
            "profile table has {} entries, expected {}",
            entries.len(),
            CELL_COUNT
        )));
    }

    for (index, entry) in entries.iter().enumerate() {
        if entry.id as usize != index {
            return Err(EngineError::Config(format!(
                "profile entry {} has id {}",
                index, entry.id
            )));
        }
        let expected = KERNELS[index].key;
        if entry.key != expected {
            return Err(EngineError::Config(format!(
                "cell {} key {:?} does not match kernel {:?}",
                index, entry.key, expected
            )));
        }
        let weight = entry.profile.weight;
        if !weight.is_finite() || !(0.0..=1.0).contains(&weight) {
            return Err(EngineError::Config(format!(
                "cell {} weight {} outside [0, 1]",
                index, weight
            )));
        }
    }

    Ok(())
}

/// Build the population from a validated profile table
pub fn build_cells(entries: &[ProfileEntry], lr: f64) -> Result<[Cell; CELL_COUNT], EngineError> {
    validate_profile_table(entries)?;

    let cells: Vec<Cell> = entries
        .iter()
        .map(|entry| Cell::new(entry.id, KERNELS[entry.id as usize].key, entry.profile, lr))
        .collect();

    cells.try_into().map_err(|cells: Vec<Cell>| {
        EngineError::Config(format!("built {} cells, expected {}", cells.len(), CELL_COUNT))
    })
}

// =============================================================================
// TESTS
// =============================================================================
