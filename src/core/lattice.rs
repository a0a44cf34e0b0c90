//! Phase lattice: total-order algebra over the six phases plus the transition barrier
//!
//! Order: perceive < represent < reason < decide < act < reflect, cyclic.
//! `advance` moves at most one step; the lattice never skips a phase.

use crate::PHASE_COUNT;
use crate::types::{EngineError, Phase};

impl Phase {
    /// Cyclic successor (reflect wraps to perceive)
    pub fn successor(self) -> Phase {
        self.offset(1)
    }

    /// Step along the lattice. Requests larger than one are clamped to one.
    pub fn advance(self, requested: u64) -> Phase {
        self.offset(requested.min(1))
    }

    /// Phase `steps` positions further along the cycle
    pub fn offset(self, steps: u64) -> Phase {
        let count = PHASE_COUNT as u64;
        let index = (self.index() as u64 + steps % count) % count;
        Phase::ALL[index as usize]
    }

    /// Least upper bound in the total order
    pub fn join(self, other: Phase) -> Phase {
        self.max(other)
    }

    /// Greatest lower bound in the total order
    pub fn meet(self, other: Phase) -> Phase {
        self.min(other)
    }

    /// Forward distance from `self` to `other` around the cycle (0..6)
    pub fn distance_to(self, other: Phase) -> u64 {
        let from = self.index() as u64;
        let to = other.index() as u64;
        (to + PHASE_COUNT as u64 - from) % PHASE_COUNT as u64
    }

    /// Phase at a given tick for an engine that starts in perceive
    pub fn at_tick(tick: u64) -> Phase {
        Phase::Perceive.offset(tick)
    }
}

/// One-shot token bracketing a phase transition
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Barrier {
    bound: Option<String>,
}

impl Barrier {
    pub fn new() -> Self {
        Self { bound: None }
    }

    pub fn is_open(&self) -> bool {
        self.bound.is_some()
    }

    /// Hash the open barrier is bound to
    pub fn bound_hash(&self) -> Option<&str> {
        self.bound.as_deref()
    }

    /// Open the barrier bound to `hash`. Opening an open barrier is an error.
    pub fn open(&mut self, hash: String) -> Result<(), EngineError> {
        if let Some(existing) = &self.bound {
            return Err(EngineError::Protocol(format!(
                "barrier already open (bound to {})",
                existing
            )));
        }
        self.bound = Some(hash);
        Ok(())
    }

    /// Release the barrier, returning its bound hash. Releasing a closed barrier is an error.
    pub fn release(&mut self) -> Result<String, EngineError> {
        self.bound
            .take()
            .ok_or_else(|| EngineError::Protocol("barrier released while closed".to_string()))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_successor_cycle() {
        assert_eq!(Phase::Perceive.successor(), Phase::Represent);
        assert_eq!(Phase::Decide.successor(), Phase::Act);
        assert_eq!(Phase::Reflect.successor(), Phase::Perceive);
    }

    #[test]
    fn test_advance_clamps_to_one_step() {
        assert_eq!(Phase::Reason.advance(5), Phase::Decide);
        assert_eq!(Phase::Reason.advance(1), Phase::Decide);
        assert_eq!(Phase::Reason.advance(0), Phase::Reason);
    }

    #[test]
    fn test_six_steps_return_home() {
        for phase in Phase::ALL {
            assert_eq!(phase.offset(6), phase);
        }
    }

    #[test]
    fn test_join_meet() {
        assert_eq!(Phase::Reason.join(Phase::Act), Phase::Act);
        assert_eq!(Phase::Reason.meet(Phase::Act), Phase::Reason);
        assert_eq!(Phase::Reflect.join(Phase::Perceive), Phase::Reflect);
        assert_eq!(Phase::Decide.meet(Phase::Decide), Phase::Decide);
    }

    #[test]
    fn test_offset_near_u64_max() {
        // u64::MAX is 3 mod 6
        assert_eq!(Phase::Perceive.offset(u64::MAX), Phase::Decide);
        assert_eq!(Phase::Reflect.offset(u64::MAX), Phase::Reason);
        assert_eq!(Phase::at_tick(u64::MAX), Phase::Decide);
    }

    #[test]
    fn test_distance_wraps() {
        assert_eq!(Phase::Reflect.distance_to(Phase::Perceive), 1);
        assert_eq!(Phase::Perceive.distance_to(Phase::Reflect), 5);
        assert_eq!(Phase::Act.distance_to(Phase::Act), 0);
    }

    #[test]
    fn test_barrier_open_release() {
        let mut barrier = Barrier::new();
        assert!(!barrier.is_open());
        barrier.open("h:00000001".to_string()).unwrap();
        assert_eq!(barrier.bound_hash(), Some("h:00000001"));
        assert_eq!(barrier.release().unwrap(), "h:00000001");
        assert!(!barrier.is_open());
    }

    #[test]
    fn test_barrier_double_open_fails() {
        let mut barrier = Barrier::new();
        barrier.open("h:00000001".to_string()).unwrap();
        let err = barrier.open("h:00000002".to_string()).unwrap_err();
        assert!(matches!(err, EngineError::Protocol(_)));
        // The original binding survives the failed open
        assert_eq!(barrier.bound_hash(), Some("h:00000001"));
    }

    #[test]
    fn test_barrier_release_closed_fails() {
        let mut barrier = Barrier::new();
        assert!(matches!(barrier.release(), Err(EngineError::Protocol(_))));
    }
}
