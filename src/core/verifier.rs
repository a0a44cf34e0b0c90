//! Verifier: staged, fail-fast replay of a frame log
//!
//! S0 non-empty, S1 header (warning), S2 mask ticks strictly increasing,
//! S3 known mask reasons, S4 proof hashes, S5 phase order, S6 answer hashes,
//! S7 reward hashes, S8 ok.
//!
//! Fixpoint detection runs alongside and only ever produces warnings.

use std::collections::{BTreeMap, BTreeSet};

use crate::SENTINEL_HASH;
use crate::core::collapse::answer_proof_hash;
use crate::core::proof::event_proof_hash;
use crate::core::reward::{credits_hash, reward_proof_hash};
use crate::types::{
    AuditWarning, Frame, MaskReason, ProofEvent, VerifyFailure, VerifyReport, VerifyStage,
};

/// Verify a frame log
pub fn verify(frames: &[Frame]) -> Result<VerifyReport, VerifyFailure> {
    let mut warnings = Vec::new();

    // S0
    if frames.is_empty() {
        return Err(fail(frames, VerifyStage::S0_NON_EMPTY, 0, "no frames".to_string()));
    }

    // S1
    if !matches!(frames[0], Frame::Header { .. }) {
        tracing::warn!("frame log has no header");
        warnings.push(AuditWarning::MissingHeader);
    }

    // S2
    let mut last_mask_tick: Option<u64> = None;
    for (index, frame) in frames.iter().enumerate() {
        if let Frame::Mask { tick, .. } = frame {
            if let Some(prev) = last_mask_tick {
                if *tick <= prev {
                    return Err(fail(
                        frames,
                        VerifyStage::S2_TICK_MONOTONIC,
                        index,
                        format!("mask tick {} after {}", tick, prev),
                    ));
                }
            }
            last_mask_tick = Some(*tick);
        }
    }

    // S3
    for (index, frame) in frames.iter().enumerate() {
        if let Frame::Mask { masked, .. } = frame {
            if let Some(entry) = masked.iter().find(|e| MaskReason::from_code(&e.reason).is_none()) {
                return Err(fail(
                    frames,
                    VerifyStage::S3_MASK_REASONS,
                    index,
                    format!("cell {} has unknown reason {:?}", entry.cell_id, entry.reason),
                ));
            }
        }
    }

    // S4
    let mut proofs = 0;
    for (index, event) in proof_events(frames) {
        let expected = event_proof_hash(&event.inputs_hash, &event.outputs_hash, &event.policy_hash);
        if expected != event.proof_hash {
            return Err(fail(
                frames,
                VerifyStage::S4_PROOF_HASH,
                index,
                format!(
                    "cell {} tick {}: recorded {} recomputed {}",
                    event.cell_id, event.tick, event.proof_hash, expected
                ),
            ));
        }
        proofs += 1;
    }

    // S5
    let mut prev: Option<&ProofEvent> = None;
    for (index, event) in proof_events(frames) {
        if let Some(p) = prev {
            let regressed = event.tick < p.tick || p.phase.offset(event.tick - p.tick) != event.phase;
            if regressed {
                return Err(fail(
                    frames,
                    VerifyStage::S5_PHASE_ORDER,
                    index,
                    format!(
                        "{} at tick {} follows {} at tick {}",
                        event.phase, event.tick, p.phase, p.tick
                    ),
                ));
            }
        }
        prev = Some(event);
    }

    // S6
    let mut answers = 0;
    for (index, frame) in frames.iter().enumerate() {
        if let Frame::Answer(answer) = frame {
            let expected = answer_proof_hash(&answer.evidence_hash, &answer.proposal_hash, &answer.policy_hash);
            if expected != answer.proof_hash {
                return Err(fail(
                    frames,
                    VerifyStage::S6_ANSWER_HASH,
                    index,
                    format!(
                        "answer tick {}: recorded {} recomputed {}",
                        answer.tick, answer.proof_hash, expected
                    ),
                ));
            }
            answers += 1;
        }
    }

    // S7
    let mut rewards = 0;
    for (index, frame) in frames.iter().enumerate() {
        if let Frame::Reward(record) = frame {
            let recomputed_credits = credits_hash(&record.credits);
            if recomputed_credits != record.credits_hash {
                return Err(fail(
                    frames,
                    VerifyStage::S7_REWARD_HASH,
                    index,
                    format!(
                        "reward tick {}: credits hash {} recomputed {}",
                        record.tick, record.credits_hash, recomputed_credits
                    ),
                ));
            }
            let expected = reward_proof_hash(record.reward, &record.credits_hash, &record.policy_hash);
            if expected != record.proof_hash {
                return Err(fail(
                    frames,
                    VerifyStage::S7_REWARD_HASH,
                    index,
                    format!(
                        "reward tick {}: recorded {} recomputed {}",
                        record.tick, record.proof_hash, expected
                    ),
                ));
            }
            rewards += 1;
        }
    }

    warnings.extend(audit_fixpoints(frames));

    Ok(VerifyReport {
        stage: VerifyStage::S8_OK,
        frames: frames.len(),
        proofs,
        answers,
        rewards,
        last_proof_hash: last_hash_before(frames, frames.len()),
        warnings,
    })
}

/// Cells that repeated an identical (inputs, outputs) pair. One warning per distinct pair.
pub fn audit_fixpoints(frames: &[Frame]) -> Vec<AuditWarning> {
    let mut first_seen: BTreeMap<(u8, &str, &str), u64> = BTreeMap::new();
    let mut reported: BTreeSet<(u8, &str, &str)> = BTreeSet::new();
    let mut warnings = Vec::new();

    for (_, event) in proof_events(frames) {
        let key = (event.cell_id, event.inputs_hash.as_str(), event.outputs_hash.as_str());
        match first_seen.get(&key) {
            Some(first_tick) => {
                if reported.insert(key) {
                    tracing::warn!(
                        cell = event.cell_id,
                        first_tick = *first_tick,
                        repeat_tick = event.tick,
                        "fixpoint: cell should have been masked"
                    );
                    warnings.push(AuditWarning::Fixpoint {
                        cell_id: event.cell_id,
                        first_tick: *first_tick,
                        repeat_tick: event.tick,
                        inputs_hash: event.inputs_hash.clone(),
                        outputs_hash: event.outputs_hash.clone(),
                    });
                }
            }
            None => {
                first_seen.insert(key, event.tick);
            }
        }
    }

    warnings
}

fn proof_events(frames: &[Frame]) -> impl Iterator<Item = (usize, &ProofEvent)> {
    frames.iter().enumerate().filter_map(|(index, frame)| match frame {
        Frame::Proof(event) => Some((index, event)),
        _ => None,
    })
}

/// Proof hash of the last hashed record before `index`
fn last_hash_before(frames: &[Frame], index: usize) -> String {
    frames[..index.min(frames.len())]
        .iter()
        .rev()
        .find_map(|frame| match frame {
            Frame::Proof(_) | Frame::Answer(_) | Frame::Reward(_) => frame.proof_hash(),
            _ => None,
        })
        .unwrap_or(SENTINEL_HASH)
        .to_string()
}

fn fail(frames: &[Frame], stage: VerifyStage, frame_index: usize, detail: String) -> VerifyFailure {
    let failure = VerifyFailure {
        stage,
        frame_index,
        last_valid_proof: last_hash_before(frames, frame_index),
        detail,
    };
    tracing::warn!(%failure, "verification failed");
    failure
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::engine::Engine;
    use crate::types::{MaskEntry, Phase, TickInput};

    fn log(ticks: u64) -> Vec<Frame> {
        let mut engine = Engine::for_cluster(1).unwrap();
        engine.run_constant(&TickInput::new(0.32, 0.0, 1), ticks).unwrap();
        engine.into_log()
    }

    fn first_proof_index(frames: &[Frame]) -> usize {
        frames.iter().position(|f| matches!(f, Frame::Proof(_))).unwrap()
    }

    #[test]
    fn test_clean_log_passes() {
        let frames = log(12);
        let report = verify(&frames).unwrap();
        assert_eq!(report.stage, VerifyStage::S8_OK);
        assert_eq!(report.answers, 2);
        assert_eq!(report.rewards, 2);
        assert!(report.proofs > 0);
        assert!(!report.warnings.contains(&AuditWarning::MissingHeader));
    }

    #[test]
    fn test_empty_fails_s0() {
        let err = verify(&[]).unwrap_err();
        assert_eq!(err.stage, VerifyStage::S0_NON_EMPTY);
        assert_eq!(err.last_valid_proof, SENTINEL_HASH);
    }

    #[test]
    fn test_missing_header_is_warning() {
        let frames = log(2);
        let report = verify(&frames[1..]).unwrap();
        assert!(report.warnings.contains(&AuditWarning::MissingHeader));
    }

    #[test]
    fn test_repeated_mask_tick_fails_s2() {
        let mut frames = log(2);
        let duplicate = frames.iter().find(|f| matches!(f, Frame::Mask { .. })).cloned().unwrap();
        frames.push(duplicate);
        assert_eq!(verify(&frames).unwrap_err().stage, VerifyStage::S2_TICK_MONOTONIC);
    }

    #[test]
    fn test_unknown_reason_fails_s3() {
        let mut frames = log(1);
        for frame in frames.iter_mut() {
            if let Frame::Mask { masked, .. } = frame {
                masked.push(MaskEntry {
                    cell_id: 3,
                    reason: "because".to_string(),
                });
            }
        }
        assert_eq!(verify(&frames).unwrap_err().stage, VerifyStage::S3_MASK_REASONS);
    }

    #[test]
    fn test_each_proof_field_guarded() {
        let clean = log(1);
        let index = first_proof_index(&clean);

        for field in 0..3 {
            let mut frames = clean.clone();
            if let Frame::Proof(event) = &mut frames[index] {
                match field {
                    0 => event.inputs_hash = "h:deadbeef".to_string(),
                    1 => event.outputs_hash = "h:deadbeef".to_string(),
                    _ => event.policy_hash = "forged".to_string(),
                }
            }
            let err = verify(&frames).unwrap_err();
            assert_eq!(err.stage, VerifyStage::S4_PROOF_HASH);
            assert_eq!(err.frame_index, index);
            assert_eq!(err.last_valid_proof, SENTINEL_HASH);
        }
    }

    #[test]
    fn test_last_valid_proof_reported() {
        let mut frames = log(1);
        let first = first_proof_index(&frames);
        let expected = frames[first].proof_hash().unwrap().to_string();
        if let Frame::Proof(event) = &mut frames[first + 1] {
            event.proof_hash = "h:00000bad".to_string();
        }
        let err = verify(&frames).unwrap_err();
        assert_eq!(err.last_valid_proof, expected);
    }

    #[test]
    fn test_phase_regression_fails_s5() {
        let mut frames = log(2);
        let last = frames.iter().rposition(|f| matches!(f, Frame::Proof(_))).unwrap();
        if let Frame::Proof(event) = &mut frames[last] {
            event.phase = Phase::Perceive;
        }
        assert_eq!(verify(&frames).unwrap_err().stage, VerifyStage::S5_PHASE_ORDER);
    }

    #[test]
    fn test_huge_tick_gap_checked_without_overflow() {
        let proofs: Vec<Frame> = log(1)
            .into_iter()
            .filter(|f| matches!(f, Frame::Proof(_)))
            .take(2)
            .collect();

        let relabel = |second: Phase| {
            let mut frames = proofs.clone();
            if let Frame::Proof(event) = &mut frames[0] {
                event.phase = Phase::Reflect;
                event.tick = 0;
            }
            if let Frame::Proof(event) = &mut frames[1] {
                event.phase = second;
                event.tick = u64::MAX;
            }
            frames
        };

        let err = verify(&relabel(Phase::Act)).unwrap_err();
        assert_eq!(err.stage, VerifyStage::S5_PHASE_ORDER);
        assert_eq!(err.frame_index, 1);
        assert_eq!(err.last_valid_proof, proofs[0].proof_hash().unwrap());

        // reflect + (u64::MAX mod 6 = 3) lands on reason
        assert!(verify(&relabel(Phase::Reason)).is_ok());
    }

    #[test]
    fn test_tampered_answer_fails_s6() {
        let mut frames = log(6);
        for frame in frames.iter_mut() {
            if let Frame::Answer(answer) = frame {
                answer.evidence_hash = "h:deadbeef".to_string();
            }
        }
        assert_eq!(verify(&frames).unwrap_err().stage, VerifyStage::S6_ANSWER_HASH);
    }

    #[test]
    fn test_answer_content_outside_contract() {
        let mut frames = log(6);
        for frame in frames.iter_mut() {
            if let Frame::Answer(answer) = frame {
                answer.content = Some("rewritten".to_string());
            }
        }
        assert!(verify(&frames).is_ok());
    }

    #[test]
    fn test_tampered_reward_fails_s7() {
        let mut frames = log(6);
        for frame in frames.iter_mut() {
            if let Frame::Reward(record) = frame {
                record.reward += 1.0;
            }
        }
        assert_eq!(verify(&frames).unwrap_err().stage, VerifyStage::S7_REWARD_HASH);

        let mut frames = log(6);
        for frame in frames.iter_mut() {
            if let Frame::Reward(record) = frame {
                record.credits[0].credit *= 2.0;
            }
        }
        assert_eq!(verify(&frames).unwrap_err().stage, VerifyStage::S7_REWARD_HASH);
    }

    #[test]
    fn test_read_only_cell_flags_fixpoint() {
        // recall (cell 9) is read-only: same world, same inputs, same outputs
        let frames = log(12);
        let report = verify(&frames).unwrap();
        assert!(report.warnings.iter().any(|w| matches!(
            w,
            AuditWarning::Fixpoint { cell_id: 9, .. }
        )));
    }
}
