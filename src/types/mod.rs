//! Core types for cell28

mod phase;
mod cell;
mod tick;
mod mask;
mod consensus;
mod frame;
mod verify;
mod error;

pub use phase::Phase;
pub use cell::{Cell, CellProfile, Domain, Lane, ProfileEntry, Role};
pub use tick::{default_tokens, GlobalState, TickInput, Token};
pub use mask::{MaskDecision, MaskEntry, MaskReason, MaskSet};
pub use consensus::{Answer, CellCredit, Constraint, ConstraintCheck, Proposal, RewardRecord};
pub use frame::{Frame, FrameKind, ProofEvent};
pub use verify::{AuditWarning, VerifyFailure, VerifyReport, VerifyStage};
pub use error::EngineError;
