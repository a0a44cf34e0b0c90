//! Core modules for cell28

pub mod hasher;
pub mod lattice;
pub mod registry;
pub mod kernels;
pub mod masking;
pub mod collapse;
pub mod reward;
pub mod proof;
pub mod config;
pub mod engine;
pub mod verifier;
pub mod dump;
pub mod log;
pub mod input;
pub mod api;

pub use hasher::{hash_str, hash_value, canonicalize};
pub use lattice::Barrier;
pub use registry::{build_cells, default_profile_table, validate_profile_table};
pub use kernels::{execute, KERNELS};
pub use masking::{compute_masks, MaskContext};
pub use collapse::collapse;
pub use reward::propagate;
pub use config::EngineConfig;
pub use engine::{Engine, TickReport};
pub use verifier::{audit_fixpoints, verify};
pub use dump::{decode_dump, encode_dump, DumpRecord};
pub use log::{fingerprint, load_log, save_log, verify_fingerprint};
pub use input::parse_tokens;
pub use api::{create_router, run_server};
