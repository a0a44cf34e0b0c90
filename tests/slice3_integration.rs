//! Integration tests for Slice 3 - collapse and reward
//!
//! Tests the consensus rule at decide exit and credit propagation at reflect exit

use cell28::core::collapse::{answer_proof_hash, collapse, evidence_hash, select_proposal};
use cell28::core::registry::default_profile_table;
use cell28::core::reward::{credits_hash, reward_proof_hash, reward_value};
use cell28::core::{Engine, EngineConfig};
use cell28::types::{Constraint, ConstraintCheck, Lane, Proposal, TickInput};
use cell28::{DEFAULT_DECAY, DEFAULT_POLICY_HASH, SENTINEL_HASH};
use pretty_assertions::assert_eq;
use std::collections::BTreeSet;

fn proposal(cell_id: u8, hash: &str, weight: f64) -> Proposal {
    Proposal {
        cell_id,
        abr_id: format!("p{}", cell_id),
        output_hash: hash.to_string(),
        content: format!("p{}", cell_id),
        support: BTreeSet::from([hash.to_string()]),
        entropy: 0.5,
        weight,
    }
}

fn veto(rule: ConstraintCheck, verified: bool) -> Constraint {
    Constraint {
        cell_id: 18,
        abr_id: "gate".to_string(),
        veto: true,
        verified,
        rule,
    }
}

/// Answer whose proposal-lane cells were moved to the evidence lane
fn engine_without_proposers() -> Engine {
    let mut table = default_profile_table();
    for entry in table.iter_mut() {
        if entry.profile.lane == Lane::Proposal {
            entry.profile.lane = Lane::Evidence;
        }
    }
    let config = EngineConfig {
        profiles: Some(table),
        ..EngineConfig::for_cluster(1, 1)
    };
    Engine::new(config).unwrap()
}

/// Evidence-backed proposal beats a heavier unsupported one
#[test]
fn test_support_dominates() {
    let evidence = BTreeSet::from(["h:00000aaa".to_string()]);
    let proposals = vec![proposal(16, "h:00000bbb", 1.0), proposal(17, "h:00000aaa", 0.1)];
    let selected = select_proposal(&proposals, &[], &evidence).unwrap();
    assert_eq!(selected.cell_id, 17);
}

/// Equal scores fall through to the hash and then the cell id
#[test]
fn test_tie_break_deterministic() {
    let evidence = BTreeSet::new();
    let a = proposal(14, "h:00000001", 0.5);
    let b = proposal(15, "h:00000002", 0.5);

    let forward = select_proposal(&[a.clone(), b.clone()], &[], &evidence).unwrap().cell_id;
    let reverse = select_proposal(&[b, a], &[], &evidence).unwrap().cell_id;
    assert_eq!(forward, reverse);

    let twin_a = proposal(16, "h:00000003", 0.5);
    let twin_b = proposal(12, "h:00000003", 0.5);
    assert_eq!(select_proposal(&[twin_a, twin_b], &[], &evidence).unwrap().cell_id, 12);
}

/// Unverified vetoes and verified non-vetoes do not filter
#[test]
fn test_only_active_vetoes_filter() {
    let evidence = BTreeSet::new();
    let proposals = vec![proposal(17, "h:00000001", 0.2)];

    let unverified = veto(ConstraintCheck::MinWeight { floor: 0.9 }, false);
    assert!(select_proposal(&proposals, &[unverified], &evidence).is_some());

    let mut advisory = veto(ConstraintCheck::MinWeight { floor: 0.9 }, true);
    advisory.veto = false;
    assert!(select_proposal(&proposals, &[advisory], &evidence).is_some());

    let active = veto(ConstraintCheck::MinWeight { floor: 0.9 }, true);
    assert!(select_proposal(&proposals, &[active], &evidence).is_none());
}

/// Nothing survives: sentinel proposal hash, no content, still a valid proof
#[test]
fn test_collapse_without_survivors() {
    let evidence = BTreeSet::from(["h:0000000e".to_string()]);
    let proposals = vec![proposal(17, "h:00000001", 0.2)];
    let constraints = vec![veto(ConstraintCheck::MinWeight { floor: 0.9 }, true)];

    let answer = collapse(3, &proposals, &constraints, &evidence, DEFAULT_POLICY_HASH);
    assert_eq!(answer.proposal_hash, SENTINEL_HASH);
    assert_eq!(answer.content, None);
    assert_eq!(answer.cell_id, None);
    assert_eq!(answer.evidence_hash, evidence_hash(&evidence));
    assert_eq!(
        answer.proof_hash,
        answer_proof_hash(&answer.evidence_hash, SENTINEL_HASH, DEFAULT_POLICY_HASH)
    );
}

/// No proposal-lane cell in the population: the decide tick still emits an Answer
#[test]
fn test_no_proposers_yields_sentinel_answer() {
    let mut engine = engine_without_proposers();
    let reports = engine.run_constant(&TickInput::new(0.32, 0.0, 1), 6).unwrap();

    let answer = reports[3].answer.as_ref().unwrap();
    assert_eq!(answer.proposal_hash, SENTINEL_HASH);
    assert_eq!(answer.content, None);
    assert_ne!(answer.evidence_hash, SENTINEL_HASH);

    // reward still propagates, without the constraint term
    let reward = reports[5].reward.as_ref().unwrap();
    assert_eq!(reward.proposal_hash, SENTINEL_HASH);
    assert_eq!(reward.reward, reward_value(answer, 0.32));
}

/// Entropy far from 0.5 trips the entropy-band veto for every proposal
#[test]
fn test_entropy_veto_through_engine() {
    let mut engine = Engine::for_cluster(1).unwrap();
    let reports = engine.run_constant(&TickInput::new(0.95, 0.0, 1), 4).unwrap();
    let answer = reports[3].answer.as_ref().unwrap();
    assert_eq!(answer.proposal_hash, SENTINEL_HASH);
    assert_eq!(answer.content, None);
}

/// Reward arithmetic
#[test]
fn test_reward_value() {
    let evidence = BTreeSet::from(["h:0000000e".to_string()]);
    let proposals = vec![proposal(17, "h:00000001", 0.75)];
    let answer = collapse(3, &proposals, &[], &evidence, DEFAULT_POLICY_HASH);

    // 0.65*0.5 - 0.35*|0.32-0.5|*0.5 + 0.25*1 + 0.10*0
    let expected = 0.65 * 0.5 - 0.35 * 0.18 * 0.5 + 0.25;
    assert!((reward_value(&answer, 0.32) - expected).abs() < 1e-12);

    let empty = collapse(3, &[], &[], &BTreeSet::new(), DEFAULT_POLICY_HASH);
    let expected_empty = -0.35 * 0.18 * 0.5;
    assert!((reward_value(&empty, 0.32) - expected_empty).abs() < 1e-12);
}

/// Credits sum to the reward and the record hashes recompute
#[test]
fn test_reward_conservation() {
    let mut engine = Engine::for_cluster(1).unwrap();
    let reports = engine.run_constant(&TickInput::new(0.32, 0.0, 1), 12).unwrap();

    let rewards: Vec<_> = reports.iter().filter_map(|r| r.reward.as_ref()).collect();
    assert_eq!(rewards.len(), 2);
    for record in rewards {
        assert!(!record.credits.is_empty());
        assert!((record.credit_total() - record.reward).abs() < 1e-9);
        assert!(record.credits.windows(2).all(|w| w[0].cell_id < w[1].cell_id));
        assert_eq!(record.credits_hash, credits_hash(&record.credits));
        assert_eq!(
            record.proof_hash,
            reward_proof_hash(record.reward, &record.credits_hash, &record.policy_hash)
        );
    }
}

/// Participants' bias moves by lr * credit, then decays
#[test]
fn test_bias_update() {
    let mut engine = Engine::for_cluster(1).unwrap();
    let reports = engine.run_constant(&TickInput::new(0.32, 0.0, 1), 6).unwrap();
    let record = reports[5].reward.as_ref().unwrap();

    for credit in &record.credits {
        let cell = engine.cell(credit.cell_id).unwrap();
        let expected = (cell.lr * credit.credit) * (1.0 - DEFAULT_DECAY);
        assert!((cell.bias - expected).abs() < 1e-15, "cell {}", credit.cell_id);
    }

    // non-participants keep a zero bias
    let participants: BTreeSet<u8> = record.credits.iter().map(|c| c.cell_id).collect();
    for cell in engine.cells().iter().filter(|c| !participants.contains(&c.id)) {
        assert_eq!(cell.bias, 0.0);
    }
}

/// Answer and reward agree on the hashes they carry
#[test]
fn test_reward_links_answer() {
    let mut engine = Engine::for_cluster(1).unwrap();
    let reports = engine.run_constant(&TickInput::new(0.32, 0.0, 1), 6).unwrap();
    let answer = reports[3].answer.as_ref().unwrap();
    let reward = reports[5].reward.as_ref().unwrap();

    assert_eq!(reward.evidence_hash, answer.evidence_hash);
    assert_eq!(reward.proposal_hash, answer.proposal_hash);
    assert_eq!(reward.policy_hash, answer.policy_hash);
}
