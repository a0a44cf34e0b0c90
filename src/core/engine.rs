//! Engine: one tick = enter -> mask -> execute -> exit -> collapse? -> reward? -> advance
//!
//! The engine owns every piece of cell and cycle state. Instances share
//! nothing, so clusters are simply separate engines with distinct cluster ids.
//! `tick` takes `&mut self`; callers own serialisation.

use std::collections::BTreeSet;
use serde::Serialize;
use serde_json::json;

use crate::{CELL_COUNT, PHASE_COUNT, SENTINEL_HASH, VERSION};
use crate::core::collapse::{collapse, make_constraint, make_proposal};
use crate::core::config::EngineConfig;
use crate::core::hasher::hash_value;
use crate::core::kernels::execute;
use crate::core::lattice::Barrier;
use crate::core::masking::{compute_masks, MaskContext};
use crate::core::proof::{inputs_hash, make_event, outputs_hash, tokens_hash};
use crate::core::registry::build_cells;
use crate::core::reward::propagate;
use crate::types::{
    Answer, Cell, EngineError, Frame, GlobalState, Lane, Phase, RewardRecord, TickInput,
};

/// Summary of one tick
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickReport {
    pub tick: u64,
    pub phase: Phase,
    pub mask_bits: u32,
    /// Executed cell ids, ascending
    pub executed: Vec<u8>,
    pub answer: Option<Answer>,
    pub reward: Option<RewardRecord>,
}

/// The micro-execution engine
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    cells: [Cell; CELL_COUNT],
    global: GlobalState,
    barrier: Barrier,
    frames: Vec<Frame>,
    last_answer: Option<Answer>,
    /// Cycle index (tick / 6) of `last_answer`
    answer_cycle: Option<u64>,
    prev_cluster_id: Option<u32>,
    /// Raised when a state-writing kernel changed state; consumed by the next mask
    state_mutated: bool,
    last_proof_hash: String,
}

impl Engine {
    /// Build an engine. Configuration errors are fatal here.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let cells = build_cells(&config.profile_table(), config.learning_rate)?;
        let global = GlobalState::new(config.cluster_id, config.cluster_count);

        let header = Frame::Header {
            version: VERSION.to_string(),
            policy_hash: config.policy_hash.clone(),
            cell_count: CELL_COUNT as u32,
            cluster_id: config.cluster_id,
            cluster_count: config.cluster_count,
        };

        Ok(Self {
            config,
            cells,
            global,
            barrier: Barrier::new(),
            frames: vec![header],
            last_answer: None,
            answer_cycle: None,
            prev_cluster_id: None,
            state_mutated: false,
            last_proof_hash: SENTINEL_HASH.to_string(),
        })
    }

    /// Default configuration for one cluster
    pub fn for_cluster(cluster_id: u32) -> Result<Self, EngineError> {
        Self::new(EngineConfig::for_cluster(cluster_id, 1))
    }

    /// Advance one tick
    pub fn tick(&mut self, input: &TickInput) -> Result<TickReport, EngineError> {
        input.validate()?;

        let tick = self.global.tick;
        let phase = self.global.phase;
        let policy_hash = self.config.policy_hash.clone();

        self.global.apply(input);
        let cluster_changed = self.prev_cluster_id != Some(input.cluster_id);

        self.frames.push(Frame::PhaseEnter { tick, phase });

        // Mask
        let ctx = MaskContext {
            tick,
            phase,
            cluster_changed,
            answer_exists: self.last_answer.is_some(),
            state_mutated: self.state_mutated,
        };
        let masks = compute_masks(&self.cells, &ctx);
        self.frames.push(Frame::Mask {
            tick,
            phase,
            bits: masks.bits,
            masked: masks.entries(),
        });
        self.state_mutated = false;
        self.prev_cluster_id = Some(input.cluster_id);

        // Execute eligible cells in ascending id order
        let tokens_hash = tokens_hash(&self.global.tokens);
        let mut evidence = BTreeSet::new();
        let mut proposals = Vec::new();
        let mut constraints = Vec::new();
        let mut executed = Vec::new();

        for id in 0..CELL_COUNT {
            if !masks.is_eligible(id as u8) {
                continue;
            }

            let inputs = inputs_hash(&self.cells[id], &self.global, &tokens_hash);
            let execution = execute(&mut self.cells[id], &self.global);
            if execution.state_changed {
                self.state_mutated = true;
            }

            let cell = &self.cells[id];
            let outputs = outputs_hash(cell, execution.signal);
            match cell.profile().lane {
                Lane::Evidence => {
                    evidence.insert(outputs.clone());
                }
                Lane::Proposal => proposals.push(make_proposal(
                    cell,
                    &outputs,
                    execution.signal,
                    self.global.entropy,
                )),
                Lane::Constraint => constraints.push(make_constraint(cell, execution.signal)),
                Lane::Control => {}
            }

            let event = make_event(&self.global, cell, execution.signal, inputs, outputs.clone(), &policy_hash);
            self.last_proof_hash = event.proof_hash.clone();
            self.frames.push(Frame::Proof(event));
            self.cells[id].last_output_hash = Some(outputs);
            executed.push(id as u8);
        }

        self.frames.push(Frame::PhaseExit { tick, phase });

        tracing::debug!(
            tick,
            phase = phase.name(),
            mask = masks.bits,
            executed = executed.len(),
            "tick executed"
        );

        let cycle = tick / PHASE_COUNT as u64;

        // Collapse at decide exit
        let mut answer = None;
        if phase == Phase::Decide {
            let emitted = collapse(tick, &proposals, &constraints, &evidence, &policy_hash);
            tracing::info!(
                tick,
                proposal = %emitted.proposal_hash,
                proof = %emitted.proof_hash,
                "answer emitted"
            );
            self.last_proof_hash = emitted.proof_hash.clone();
            self.frames.push(Frame::Answer(emitted.clone()));
            self.last_answer = Some(emitted.clone());
            self.answer_cycle = Some(cycle);
            answer = Some(emitted);
        }

        // Reward at reflect exit, only for this cycle's answer
        let mut reward = None;
        if phase == Phase::Reflect && self.answer_cycle == Some(cycle) {
            if let Some(current) = &self.last_answer {
                let record = propagate(
                    tick,
                    current,
                    self.global.entropy,
                    &executed,
                    &mut self.cells,
                    &evidence,
                    self.config.decay,
                    &policy_hash,
                );
                self.last_proof_hash = record.proof_hash.clone();
                self.frames.push(Frame::Reward(record.clone()));
                reward = Some(record);
            }
        }

        // Advance, bracketed by the barrier
        let next = phase.advance(1);
        self.barrier.open(hash_value(&json!({
            "tick": tick,
            "from": phase.name(),
            "to": next.name(),
        })))?;
        self.global.phase = next;
        self.barrier.release()?;
        self.global.tick += 1;

        Ok(TickReport {
            tick,
            phase,
            mask_bits: masks.bits,
            executed,
            answer,
            reward,
        })
    }

    /// Run a sequence of inputs, one tick each
    pub fn run(&mut self, inputs: &[TickInput]) -> Result<Vec<TickReport>, EngineError> {
        inputs.iter().map(|input| self.tick(input)).collect()
    }

    /// Run `ticks` ticks on the same input
    pub fn run_constant(&mut self, input: &TickInput, ticks: u64) -> Result<Vec<TickReport>, EngineError> {
        (0..ticks).map(|_| self.tick(input)).collect()
    }

    /// Frames emitted so far (no End frame)
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// The End frame for the log as it stands
    pub fn end_frame(&self) -> Frame {
        Frame::End {
            tick: self.global.tick,
            last_proof_hash: self.last_proof_hash.clone(),
        }
    }

    /// Copy of the log closed with an End frame
    pub fn sealed_log(&self) -> Vec<Frame> {
        let mut frames = self.frames.clone();
        frames.push(self.end_frame());
        frames
    }

    /// Consume the engine and return its closed log
    pub fn into_log(mut self) -> Vec<Frame> {
        let end = self.end_frame();
        self.frames.push(end);
        self.frames
    }

    pub fn cells(&self) -> &[Cell; CELL_COUNT] {
        &self.cells
    }

    pub fn cell(&self, id: u8) -> Option<&Cell> {
        self.cells.get(id as usize)
    }

    pub fn global(&self) -> &GlobalState {
        &self.global
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Next tick to run
    pub fn current_tick(&self) -> u64 {
        self.global.tick
    }

    /// Phase the next tick will run in
    pub fn phase(&self) -> Phase {
        self.global.phase
    }

    pub fn last_answer(&self) -> Option<&Answer> {
        self.last_answer.as_ref()
    }

    pub fn last_proof_hash(&self) -> &str {
        &self.last_proof_hash
    }
}

// =============================================================================
// TESTS
// =============================================================================
