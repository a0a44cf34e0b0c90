//! Engine error taxonomy

/// Errors from construction, protocol misuse, and the I/O edges of the crate.
///
/// Verification failures are reported separately as [`crate::types::VerifyFailure`].
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Malformed profile table or engine parameters. Fatal at construction.
    #[error("configuration error: {0}")]
    Config(String),

    /// Barrier opened while open, or released while closed
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Log or config file could not be read or written
    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// JSON encode/decode failure
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Unparseable driver input
    #[error("invalid input: {0}")]
    Input(String),

    /// Truncated or malformed binary dump
    #[error("dump error: {0}")]
    Dump(String),
}
