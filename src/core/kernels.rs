//! Kernel set: 28 pure signal functions, indexed by cell id
//!
//! Each kernel maps (cell, global state) to a scalar signal. The token stream
//! is part of the global state. Kernels never mutate anything themselves: the
//! engine applies the kernel's declared effect after the call, so only the
//! three state-writing effects can ever touch `Cell::state`.

use crate::{CELL_COUNT, NUMERIC_PRECISION};
use crate::core::hasher::round_to;
use crate::types::{Cell, GlobalState};

/// Kernel signature
pub type KernelFn = fn(&Cell, &GlobalState) -> f64;

/// What the engine does with a kernel's signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelEffect {
    /// `activation += signal`
    Accumulate,
    /// Neither activation nor state change
    ReadOnly,
    /// Accumulate, then `state = signal`
    Store,
    /// Accumulate, then `state += signal`
    Integrate,
    /// Accumulate, then `state = activation`
    Persist,
}

impl KernelEffect {
    pub fn writes_state(&self) -> bool {
        matches!(self, KernelEffect::Store | KernelEffect::Integrate | KernelEffect::Persist)
    }
}

/// A kernel bound to a cell id
#[derive(Debug, Clone, Copy)]
pub struct Kernel {
    pub key: &'static str,
    pub effect: KernelEffect,
    pub run: KernelFn,
}

const fn kernel(key: &'static str, effect: KernelEffect, run: KernelFn) -> Kernel {
    Kernel { key, effect, run }
}

use KernelEffect::{Accumulate, Integrate, Persist, ReadOnly, Store};

/// The kernel table. Position = cell id = kernel id.
pub static KERNELS: [Kernel; CELL_COUNT] = [
    kernel("tok_sum", Accumulate, k00_tok_sum),
    kernel("tok_mean", Accumulate, k01_tok_mean),
    kernel("tok_var", Accumulate, k02_tok_var),
    kernel("entropy_probe", Accumulate, k03_entropy_probe),
    kernel("glyph_count", Accumulate, k04_glyph_count),
    kernel("embed", Accumulate, k05_embed),
    kernel("position", Accumulate, k06_position),
    kernel("cluster_share", Accumulate, k07_cluster_share),
    kernel("contrast", Accumulate, k08_contrast),
    kernel("recall", ReadOnly, k09_recall),
    kernel("state_watch", Accumulate, k10_state_watch),
    kernel("store", Store, k11_store),
    kernel("infer", Accumulate, k12_infer),
    kernel("deduce", Accumulate, k13_deduce),
    kernel("analogy", Accumulate, k14_analogy),
    kernel("hypothesis", Accumulate, k15_hypothesis),
    kernel("plan", Accumulate, k16_plan),
    kernel("select", Accumulate, k17_select),
    kernel("gate_entropy", ReadOnly, k18_gate_entropy),
    kernel("reward_integrate", Integrate, k19_reward_integrate),
    kernel("gate_weight", ReadOnly, k20_gate_weight),
    kernel("format_width", Accumulate, k21_format_width),
    kernel("persist", Persist, k22_persist),
    kernel("audit", ReadOnly, k23_audit),
    kernel("boot_mark", Accumulate, k24_boot_mark),
    kernel("cluster_sync", Accumulate, k25_cluster_sync),
    kernel("heartbeat", Accumulate, k26_heartbeat),
    kernel("answer_echo", Accumulate, k27_answer_echo),
];

/// Result of executing one kernel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Execution {
    pub signal: f64,
    pub state_changed: bool,
}

/// Run the kernel bound to `cell`, apply its effect, and round the results
pub fn execute(cell: &mut Cell, global: &GlobalState) -> Execution {
    let kernel = &KERNELS[cell.id as usize];
    let signal = round_to((kernel.run)(cell, global), NUMERIC_PRECISION);
    let before = cell.state;

    match kernel.effect {
        KernelEffect::ReadOnly => {}
        KernelEffect::Accumulate => cell.activation += signal,
        KernelEffect::Store => {
            cell.activation += signal;
            cell.state = signal;
        }
        KernelEffect::Integrate => {
            cell.activation += signal;
            cell.state += signal;
        }
        KernelEffect::Persist => {
            cell.activation += signal;
            cell.state = cell.activation;
        }
    }

    cell.activation = round_to(cell.activation, NUMERIC_PRECISION);
    cell.state = round_to(cell.state, NUMERIC_PRECISION);
    cell.last_signal = signal;

    Execution {
        signal,
        state_changed: kernel.effect.writes_state() && cell.state != before,
    }
}

// =============================================================================
// KERNELS
// =============================================================================

fn bias(cell: &Cell, g: &GlobalState) -> f64 {
    g.reward_bias + cell.bias
}

fn k00_tok_sum(c: &Cell, g: &GlobalState) -> f64 {
    g.token_sum() + bias(c, g)
}

fn k01_tok_mean(c: &Cell, g: &GlobalState) -> f64 {
    g.token_mean() + bias(c, g)
}

fn k02_tok_var(c: &Cell, g: &GlobalState) -> f64 {
    g.token_variance() + bias(c, g)
}

fn k03_entropy_probe(c: &Cell, g: &GlobalState) -> f64 {
    g.entropy + bias(c, g)
}

fn k04_glyph_count(_c: &Cell, g: &GlobalState) -> f64 {
    let n = g.token_count() as f64;
    n / (n + 1.0)
}

fn k05_embed(c: &Cell, g: &GlobalState) -> f64 {
    g.token_mean() * (1.0 - g.entropy) + bias(c, g)
}

fn k06_position(_c: &Cell, g: &GlobalState) -> f64 {
    (g.tick % 6 + 1) as f64 / 6.0
}

fn k07_cluster_share(_c: &Cell, g: &GlobalState) -> f64 {
    (g.cluster_id as f64 + 1.0) / (g.cluster_count.max(1) as f64 + 1.0)
}

fn k08_contrast(_c: &Cell, g: &GlobalState) -> f64 {
    g.token_variance().sqrt() + (g.entropy - 0.5).abs()
}

fn k09_recall(c: &Cell, _g: &GlobalState) -> f64 {
    0.1 + 0.5 * c.activation / (1.0 + c.activation.abs())
}

fn k10_state_watch(c: &Cell, _g: &GlobalState) -> f64 {
    1.0 / (1.0 + c.activation.abs())
}

fn k11_store(c: &Cell, g: &GlobalState) -> f64 {
    g.token_mean() + bias(c, g)
}

fn k12_infer(c: &Cell, g: &GlobalState) -> f64 {
    (g.token_mean() + g.entropy) / 2.0 + bias(c, g)
}

fn k13_deduce(c: &Cell, g: &GlobalState) -> f64 {
    let n = g.token_count() as f64;
    g.token_mean() * n / (n + 1.0) + bias(c, g)
}

fn k14_analogy(c: &Cell, g: &GlobalState) -> f64 {
    1.0 - (g.entropy - g.token_mean()).abs() + bias(c, g)
}

fn k15_hypothesis(c: &Cell, g: &GlobalState) -> f64 {
    let n = g.token_count() as f64;
    g.token_sum() / (n + 1.0) * g.coherence() + bias(c, g)
}

fn k16_plan(c: &Cell, g: &GlobalState) -> f64 {
    g.token_mean() * g.coherence() + bias(c, g)
}

fn k17_select(c: &Cell, g: &GlobalState) -> f64 {
    c.profile().weight * g.coherence() + bias(c, g)
}

/// Tolerated entropy deviation from 0.5
fn k18_gate_entropy(c: &Cell, g: &GlobalState) -> f64 {
    0.35 + bias(c, g)
}

fn k19_reward_integrate(c: &Cell, g: &GlobalState) -> f64 {
    0.05 + bias(c, g)
}

/// Minimum proposer weight
fn k20_gate_weight(_c: &Cell, g: &GlobalState) -> f64 {
    (g.token_mean() * 0.8).clamp(0.05, 1.0)
}

fn k21_format_width(c: &Cell, g: &GlobalState) -> f64 {
    let n = g.token_count() as f64;
    n / (n + 4.0) + bias(c, g)
}

fn k22_persist(c: &Cell, g: &GlobalState) -> f64 {
    0.1 + bias(c, g)
}

fn k23_audit(_c: &Cell, g: &GlobalState) -> f64 {
    1.0 - g.token_variance()
}

fn k24_boot_mark(_c: &Cell, _g: &GlobalState) -> f64 {
    1.0
}

fn k25_cluster_sync(_c: &Cell, g: &GlobalState) -> f64 {
    (g.cluster_id as f64 + 1.0) / g.cluster_count.max(1) as f64
}

fn k26_heartbeat(_c: &Cell, g: &GlobalState) -> f64 {
    (g.tick % 6 + 1) as f64 / 6.0
}

fn k27_answer_echo(c: &Cell, g: &GlobalState) -> f64 {
    0.5 + bias(c, g)
}

// =============================================================================
// TESTS
// =============================================================================
