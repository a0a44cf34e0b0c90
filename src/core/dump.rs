//! Compact binary dump of a frame log
//!
//! Little-endian. A u32 frame count, then one 12-byte record per frame:
//!
//! | bytes | field                          |
//! |-------|--------------------------------|
//! | 1     | kind                           |
//! | 4     | tick                           |
//! | 1     | cell id, 255 when absent       |
//! | 1     | phase index, 255 when absent   |
//! | 1     | reason, 255 when absent        |
//! | 4     | low 32 bits of the proof hash  |
//!
//! Mask records carry the mask bits in the last field instead, and the set of
//! reasons that fired that tick in the reason byte (bit `n - 1` for rule Mn,
//! 0 when nothing was masked). Together with the bits this recovers which
//! rules masked the tick.
//! The header carries the low 32 bits of `hash(policyHash)`.

use crate::core::hasher::{hash_str, low32};
use crate::types::{EngineError, Frame, FrameKind, MaskEntry, MaskReason, Phase};

pub const RECORD_SIZE: usize = 12;
const ABSENT: u8 = 255;

/// One decoded dump record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DumpRecord {
    pub kind: FrameKind,
    pub tick: u32,
    pub cell_id: Option<u8>,
    pub phase: Option<Phase>,
    pub reason: Option<u8>,
    pub low32: u32,
}

impl DumpRecord {
    /// Project a frame onto its dump record
    pub fn from_frame(frame: &Frame) -> Result<Self, EngineError> {
        let tick = u32::try_from(frame.tick())
            .map_err(|_| EngineError::Dump(format!("tick {} does not fit in u32", frame.tick())))?;

        let reason = match frame {
            Frame::Mask { masked, .. } => Some(reason_set(masked)?),
            _ => None,
        };

        let (cell_id, low) = match frame {
            Frame::Header { policy_hash, .. } => (None, low32(&hash_str(policy_hash))),
            Frame::Mask { bits, .. } => (None, *bits),
            Frame::Proof(event) => (Some(event.cell_id), low32(&event.proof_hash)),
            Frame::Answer(answer) => (answer.cell_id, low32(&answer.proof_hash)),
            Frame::Reward(record) => (None, low32(&record.proof_hash)),
            Frame::End { last_proof_hash, .. } => (None, low32(last_proof_hash)),
            Frame::PhaseEnter { .. } | Frame::PhaseExit { .. } => (None, 0),
        };

        Ok(Self {
            kind: frame.kind(),
            tick,
            cell_id,
            phase: frame.phase(),
            reason,
            low32: low,
        })
    }

    /// Reasons recorded on a mask record, in rule order
    pub fn mask_reasons(&self) -> Vec<MaskReason> {
        let set = match (self.kind, self.reason) {
            (FrameKind::Mask, Some(set)) => set,
            _ => return Vec::new(),
        };
        MaskReason::ALL
            .iter()
            .copied()
            .filter(|r| set & r.set_bit() != 0)
            .collect()
    }

    pub fn to_bytes(&self) -> [u8; RECORD_SIZE] {
        let mut bytes = [0u8; RECORD_SIZE];
        let mut offset = 0;

        // kind (1 byte)
        bytes[offset] = self.kind.as_byte();
        offset += 1;

        // tick (4 bytes)
        bytes[offset..offset + 4].copy_from_slice(&self.tick.to_le_bytes());
        offset += 4;

        // cell, phase, reason (1 byte each)
        bytes[offset] = self.cell_id.unwrap_or(ABSENT);
        bytes[offset + 1] = self.phase.map(|p| p.index()).unwrap_or(ABSENT);
        bytes[offset + 2] = self.reason.unwrap_or(ABSENT);
        offset += 3;

        // low32 (4 bytes)
        bytes[offset..offset + 4].copy_from_slice(&self.low32.to_le_bytes());

        bytes
    }

    pub fn from_bytes(bytes: &[u8; RECORD_SIZE]) -> Result<Self, EngineError> {
        let kind = FrameKind::from_byte(bytes[0])
            .ok_or_else(|| EngineError::Dump(format!("unknown frame kind {}", bytes[0])))?;
        let tick = u32::from_le_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]);

        let cell_id = present(bytes[5]);
        let phase = match present(bytes[6]) {
            Some(index) => Some(
                Phase::from_index(index)
                    .ok_or_else(|| EngineError::Dump(format!("unknown phase index {}", index)))?,
            ),
            None => None,
        };
        let reason = present(bytes[7]);
        let low32 = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);

        Ok(Self {
            kind,
            tick,
            cell_id,
            phase,
            reason,
            low32,
        })
    }
}

fn reason_set(masked: &[MaskEntry]) -> Result<u8, EngineError> {
    masked.iter().try_fold(0u8, |set, entry| {
        let reason = MaskReason::from_code(&entry.reason).ok_or_else(|| {
            EngineError::Dump(format!(
                "cell {} has unknown mask reason {:?}",
                entry.cell_id, entry.reason
            ))
        })?;
        Ok(set | reason.set_bit())
    })
}

fn present(byte: u8) -> Option<u8> {
    (byte != ABSENT).then_some(byte)
}

/// Encode a frame log
pub fn encode_dump(frames: &[Frame]) -> Result<Vec<u8>, EngineError> {
    let count = u32::try_from(frames.len())
        .map_err(|_| EngineError::Dump(format!("{} frames exceed u32", frames.len())))?;

    let mut bytes = Vec::with_capacity(4 + frames.len() * RECORD_SIZE);
    bytes.extend_from_slice(&count.to_le_bytes());
    for frame in frames {
        bytes.extend_from_slice(&DumpRecord::from_frame(frame)?.to_bytes());
    }
    Ok(bytes)
}

/// Decode a dump. Truncated input and trailing bytes are errors.
pub fn decode_dump(bytes: &[u8]) -> Result<Vec<DumpRecord>, EngineError> {
    let (head, body) = bytes
        .split_first_chunk::<4>()
        .ok_or_else(|| EngineError::Dump("missing frame count".to_string()))?;
    let count = u32::from_le_bytes(*head) as usize;

    let expected = count
        .checked_mul(RECORD_SIZE)
        .ok_or_else(|| EngineError::Dump(format!("frame count {} overflows", count)))?;
    if body.len() < expected {
        return Err(EngineError::Dump(format!(
            "truncated: {} records need {} bytes, found {}",
            count,
            expected,
            body.len()
        )));
    }
    if body.len() > expected {
        return Err(EngineError::Dump(format!(
            "{} trailing bytes after {} records",
            body.len() - expected,
            count
        )));
    }

    body.chunks_exact(RECORD_SIZE)
        .map(|chunk| {
            let mut record = [0u8; RECORD_SIZE];
            record.copy_from_slice(chunk);
            DumpRecord::from_bytes(&record)
        })
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================
