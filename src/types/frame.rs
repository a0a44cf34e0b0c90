//! Frame records: the append-only trace emitted by the engine

use serde::{Deserialize, Serialize};
use crate::types::{Answer, Domain, Lane, MaskEntry, Phase, RewardRecord};

/// One executed cell, hashed over a locked 3-field contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProofEvent {
    pub tick: u64,
    pub phase: Phase,
    pub cell_id: u8,
    pub kernel_id: u8,
    pub domain: Domain,
    pub lane: Lane,
    pub signal: f64,
    pub activation: f64,
    pub state: f64,
    pub inputs_hash: String,
    pub outputs_hash: String,
    pub policy_hash: String,
    /// `hash({inputsHash, outputsHash, policyHash})`
    pub proof_hash: String,
}

/// Tagged frame record. One variant per frame kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Frame {
    Header {
        version: String,
        policy_hash: String,
        cell_count: u32,
        cluster_id: u32,
        cluster_count: u32,
    },
    PhaseEnter {
        tick: u64,
        phase: Phase,
    },
    Mask {
        tick: u64,
        phase: Phase,
        bits: u32,
        masked: Vec<MaskEntry>,
    },
    Proof(ProofEvent),
    PhaseExit {
        tick: u64,
        phase: Phase,
    },
    Answer(Answer),
    Reward(RewardRecord),
    End {
        tick: u64,
        last_proof_hash: String,
    },
}

/// Frame discriminant, with the byte used in the binary dump
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameKind {
    Header,
    PhaseEnter,
    Mask,
    Proof,
    PhaseExit,
    Answer,
    Reward,
    End,
}

impl FrameKind {
    pub fn as_byte(&self) -> u8 {
        match self {
            FrameKind::Header => 0,
            FrameKind::PhaseEnter => 1,
            FrameKind::Mask => 2,
            FrameKind::Proof => 3,
            FrameKind::PhaseExit => 4,
            FrameKind::Answer => 5,
            FrameKind::Reward => 6,
            FrameKind::End => 7,
        }
    }

    pub fn from_byte(byte: u8) -> Option<FrameKind> {
        match byte {
            0 => Some(FrameKind::Header),
            1 => Some(FrameKind::PhaseEnter),
            2 => Some(FrameKind::Mask),
            3 => Some(FrameKind::Proof),
            4 => Some(FrameKind::PhaseExit),
            5 => Some(FrameKind::Answer),
            6 => Some(FrameKind::Reward),
            7 => Some(FrameKind::End),
            _ => None,
        }
    }
}

impl Frame {
    pub fn kind(&self) -> FrameKind {
        match self {
            Frame::Header { .. } => FrameKind::Header,
            Frame::PhaseEnter { .. } => FrameKind::PhaseEnter,
            Frame::Mask { .. } => FrameKind::Mask,
            Frame::Proof(_) => FrameKind::Proof,
            Frame::PhaseExit { .. } => FrameKind::PhaseExit,
            Frame::Answer(_) => FrameKind::Answer,
            Frame::Reward(_) => FrameKind::Reward,
            Frame::End { .. } => FrameKind::End,
        }
    }

    /// Tick the frame belongs to (0 for the header)
    pub fn tick(&self) -> u64 {
        match self {
            Frame::Header { .. } => 0,
            Frame::PhaseEnter { tick, .. }
            | Frame::Mask { tick, .. }
            | Frame::PhaseExit { tick, .. }
            | Frame::End { tick, .. } => *tick,
            Frame::Proof(event) => event.tick,
            Frame::Answer(answer) => answer.tick,
            Frame::Reward(record) => record.tick,
        }
    }

    pub fn phase(&self) -> Option<Phase> {
        match self {
            Frame::PhaseEnter { phase, .. }
            | Frame::Mask { phase, .. }
            | Frame::PhaseExit { phase, .. } => Some(*phase),
            Frame::Proof(event) => Some(event.phase),
            _ => None,
        }
    }

    /// Proof hash carried by hashed records
    pub fn proof_hash(&self) -> Option<&str> {
        match self {
            Frame::Proof(event) => Some(&event.proof_hash),
            Frame::Answer(answer) => Some(&answer.proof_hash),
            Frame::Reward(record) => Some(&record.proof_hash),
            Frame::End { last_proof_hash, .. } => Some(last_proof_hash),
            _ => None,
        }
    }
}
