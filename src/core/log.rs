//! Frame-log persistence and fingerprints

use std::path::{Path, PathBuf};
use sha2::{Digest, Sha256};

use crate::core::hasher::canonicalize;
use crate::types::{EngineError, Frame};

pub const FINGERPRINT_PREFIX: &str = "SCXQ2-v1:";

/// Write a frame log as pretty JSON into `dir`, returning the file path
pub fn save_log(frames: &[Frame], dir: impl AsRef<Path>) -> Result<PathBuf, EngineError> {
    let dir = dir.as_ref();
    let cluster_id = frames
        .iter()
        .find_map(|f| match f {
            Frame::Header { cluster_id, .. } => Some(*cluster_id),
            _ => None,
        })
        .unwrap_or(0);

    let filename = format!(
        "log_{}_c{}.json",
        chrono::Utc::now().format("%Y%m%d_%H%M%S_%9f"),
        cluster_id
    );
    let path = dir.join(filename);

    let json = serde_json::to_string_pretty(frames)?;
    std::fs::create_dir_all(dir)?;
    std::fs::write(&path, json)?;

    tracing::info!(path = %path.display(), frames = frames.len(), "frame log saved");
    Ok(path)
}

/// Read a frame log written by `save_log`
pub fn load_log(path: impl AsRef<Path>) -> Result<Vec<Frame>, EngineError> {
    let json = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}

/// `SCXQ2-v1:` + first 32 hex chars of SHA-256 over the canonical log
pub fn fingerprint(frames: &[Frame]) -> Result<String, EngineError> {
    let canonical = canonicalize(&serde_json::to_value(frames)?);

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    let digest = hasher.finalize();

    let hex: String = digest.iter().take(16).map(|b| format!("{:02x}", b)).collect();
    Ok(format!("{}{}", FINGERPRINT_PREFIX, hex))
}

/// True when `expected` is the fingerprint of `frames`
pub fn verify_fingerprint(frames: &[Frame], expected: &str) -> Result<bool, EngineError> {
    Ok(fingerprint(frames)? == expected.trim())
}

// =============================================================================
// TESTS
// =============================================================================
