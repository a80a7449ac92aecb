//! Error types for the simulation core.
//!
//! The tick path is total: malformed configuration is clamped at the
//! match boundary and degraded conditions resolve to defined fallbacks,
//! so no per-tick operation can fail. The only fallible surface is the
//! snapshot codec.

use thiserror::Error;

/// Result type alias using [`SimError`].
pub type Result<T> = std::result::Result<T, SimError>;

/// Top-level error type for the simulation core.
#[derive(Debug, Error)]
pub enum SimError {
    /// Snapshot encoding or decoding failed.
    #[error("snapshot codec failure: {message}")]
    Snapshot {
        /// Underlying codec error message.
        message: String,
    },
}
