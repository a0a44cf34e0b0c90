//! Masking law: per-tick, per-cell execution eligibility
//!
//! Rules, first match wins:
//! 1. act/reflect and domain != SAFE        -> collapse-locked
//! 2. domain not in the phase allowlist      -> domain-inactive
//! 3. lane not in the phase allowlist        -> lane-blocked
//! 4. tick > 0 and |last_signal| < 1e-6      -> zero-info-gain
//! 5. mandatory per-id policy (10, 24, 25, 27) -> policy-deny
//!
//! Fixpoint redundancy is not a masking rule; the verifier audits it.

use crate::ZERO_INFO_EPSILON;
use crate::types::{Cell, Domain, Lane, MaskDecision, MaskReason, MaskSet, Phase};

/// Cell ids with a mandatory policy
pub const STATE_WATCH_ID: u8 = 10;
pub const BOOT_MARK_ID: u8 = 24;
pub const CLUSTER_SYNC_ID: u8 = 25;
pub const ANSWER_ECHO_ID: u8 = 27;

/// Domains admitted by each phase
pub fn phase_domains(phase: Phase) -> &'static [Domain] {
    match phase {
        Phase::Perceive => &[Domain::Perception, Domain::Memory, Domain::Safe],
        Phase::Represent => &[Domain::Representation, Domain::Perception, Domain::Memory, Domain::Safe],
        Phase::Reason => &[Domain::Reasoning, Domain::Representation, Domain::Safe],
        Phase::Decide => &[Domain::Decision, Domain::Reasoning, Domain::Safe],
        Phase::Act => &[Domain::Safe],
        Phase::Reflect => &[Domain::Safe],
    }
}

/// Lanes admitted by each phase
pub fn phase_lanes(phase: Phase) -> &'static [Lane] {
    match phase {
        Phase::Perceive | Phase::Represent => &[Lane::Evidence, Lane::Control],
        Phase::Reason => &[Lane::Evidence, Lane::Proposal, Lane::Control],
        Phase::Decide => &[Lane::Evidence, Lane::Proposal, Lane::Constraint, Lane::Control],
        Phase::Act | Phase::Reflect => &[Lane::Evidence, Lane::Constraint, Lane::Control],
    }
}

/// Engine facts the per-id policies read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaskContext {
    pub tick: u64,
    pub phase: Phase,
    /// Cluster id differs from the previous tick (true on the first tick)
    pub cluster_changed: bool,
    /// An Answer has been produced at some earlier point
    pub answer_exists: bool,
    /// A state-writing kernel changed state during the previous tick
    pub state_mutated: bool,
}

/// Decide eligibility for one cell
pub fn decide(cell: &Cell, ctx: &MaskContext) -> MaskDecision {
    let profile = cell.profile();

    if ctx.phase.is_post_collapse() && profile.domain != Domain::Safe {
        return MaskDecision::Masked(MaskReason::M1_COLLAPSE_LOCKED);
    }
    if !phase_domains(ctx.phase).contains(&profile.domain) {
        return MaskDecision::Masked(MaskReason::M2_DOMAIN_INACTIVE);
    }
    if !phase_lanes(ctx.phase).contains(&profile.lane) {
        return MaskDecision::Masked(MaskReason::M3_LANE_BLOCKED);
    }
    if ctx.tick > 0 && cell.last_signal.abs() < ZERO_INFO_EPSILON {
        return MaskDecision::Masked(MaskReason::M4_ZERO_INFO_GAIN);
    }
    if !policy_allows(cell.id, ctx) {
        return MaskDecision::Masked(MaskReason::M5_POLICY_DENY);
    }
    MaskDecision::Eligible
}

fn policy_allows(id: u8, ctx: &MaskContext) -> bool {
    match id {
        BOOT_MARK_ID => ctx.tick == 0,
        CLUSTER_SYNC_ID => ctx.cluster_changed,
        ANSWER_ECHO_ID => ctx.answer_exists,
        STATE_WATCH_ID => ctx.state_mutated,
        _ => true,
    }
}

/// Apply the masking law to the whole population, in id order
pub fn compute_masks(cells: &[Cell], ctx: &MaskContext) -> MaskSet {
    let decisions: Vec<MaskDecision> = cells.iter().map(|cell| decide(cell, ctx)).collect();
    let bits = decisions
        .iter()
        .enumerate()
        .filter(|(_, d)| d.is_eligible())
        .fold(0u32, |bits, (id, _)| bits | (1 << id));

    MaskSet {
        tick: ctx.tick,
        phase: ctx.phase,
        bits,
        decisions,
    }
}

// =============================================================================
// TESTS
// =============================================================================
