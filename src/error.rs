//! Unified error types for stemintake
//!
//! Error strategy:
//! - Per-file errors (validation, metadata, transcode, decode): Recoverable,
//!   reported for that file, the rest of the batch continues
//! - System errors (preferences, configuration, I/O): surfaced to the caller
//!
//! Messages carry the failing path and, where useful, a hint for the user.

use std::path::PathBuf;
use thiserror::Error;

/// Formats accepted by default, used in user-facing hints
pub const SUPPORTED_FORMATS: &str = "WAV, MP3, FLAC";

/// Top-level error type for stemintake operations
#[derive(Debug, Error)]
pub enum IntakeError {
    // =========================================================================
    // Recoverable errors - skip file, continue batch
    // =========================================================================
    #[error("Rejected '{path}': {reason}\n  Supported formats: {SUPPORTED_FORMATS}")]
    Validation { path: PathBuf, reason: String },

    #[error("Failed to read metadata from '{path}': {reason}")]
    Metadata { path: PathBuf, reason: String },

    #[error("Transcoding '{path}' failed: {diagnostic}")]
    Transcode { path: PathBuf, diagnostic: String },

    #[error("Failed to decode waveform '{path}': {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("Processing of '{path}' was cancelled")]
    Cancelled { path: PathBuf },

    #[error("Internal error while processing '{path}': {reason}")]
    Internal { path: PathBuf, reason: String },

    // =========================================================================
    // Visualization errors
    // =========================================================================
    #[error("Invalid selection: {0}")]
    Selection(String),

    // =========================================================================
    // Model errors
    // =========================================================================
    #[error("Model '{name}' is not available")]
    ModelUnavailable { name: String },

    #[error("Model inference failed: {reason}")]
    Inference { reason: String },

    // =========================================================================
    // System errors
    // =========================================================================
    #[error("Cannot access preferences at '{path}': {reason}\n  Tip: Check permissions for the config directory")]
    Preferences { path: PathBuf, reason: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Illegal state transition {from} -> {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for stemintake operations
pub type Result<T> = std::result::Result<T, IntakeError>;

impl IntakeError {
    /// Returns true if this error only affects the file that raised it
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            IntakeError::Validation { .. }
                | IntakeError::Metadata { .. }
                | IntakeError::Transcode { .. }
                | IntakeError::Decode { .. }
                | IntakeError::Cancelled { .. }
                | IntakeError::Internal { .. }
        )
    }

    pub fn validation_error(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        IntakeError::Validation {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn metadata_error(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        IntakeError::Metadata {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a transcode error, keeping the encoder diagnostic verbatim
    pub fn transcode_error(path: impl Into<PathBuf>, diagnostic: impl Into<String>) -> Self {
        IntakeError::Transcode {
            path: path.into(),
            diagnostic: diagnostic.into(),
        }
    }

    pub fn decode_error(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        IntakeError::Decode {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a preferences error, translating common I/O failures
    pub fn preferences_error(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        let path = path.into();
        let reason = match err.kind() {
            std::io::ErrorKind::PermissionDenied => {
                format!("Permission denied. Check that you have write access to {}", path.display())
            }
            std::io::ErrorKind::NotFound => {
                format!(
                    "Directory does not exist: {}",
                    path.parent().map(|p| p.display().to_string()).unwrap_or_default()
                )
            }
            _ => err.to_string(),
        };
        IntakeError::Preferences { path, reason }
    }
}
