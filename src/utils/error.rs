//! Error types and handling
//!
//! Common error types used across the capture core.

use std::path::PathBuf;
use thiserror::Error;

/// Capture-wide error type
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The anchor bone lengths summed to zero (or a non-finite value)
    #[error("Degenerate pose: normalization denominator is {norm}")]
    DegeneratePose { norm: f64 },

    #[error("Invalid transition: cannot {operation} while {state}")]
    InvalidTransition {
        operation: &'static str,
        state: &'static str,
    },

    #[error("Invalid phrase name: {0:?}")]
    InvalidPhrase(String),

    #[error("Invalid session number {requested}: next available is {next}")]
    InvalidSessionNumber { requested: u32, next: u32 },

    #[error("Session {number} already exists at {path:?}")]
    SessionExists { number: u32, path: PathBuf },

    #[error("Session mismatch: active session is {active}, got {requested}")]
    SessionMismatch { active: u32, requested: u32 },

    #[error("Config error: {0}")]
    Config(String),
}

impl CaptureError {
    /// Stable code for the host UI
    pub fn code(&self) -> &'static str {
        match self {
            CaptureError::Io(_) => "IO_ERROR",
            CaptureError::Serialization(_) => "SERIALIZATION_ERROR",
            CaptureError::DegeneratePose { .. } => "DEGENERATE_POSE",
            CaptureError::InvalidTransition { .. } => "INVALID_TRANSITION",
            CaptureError::InvalidPhrase(_) => "INVALID_PHRASE",
            CaptureError::InvalidSessionNumber { .. } => "INVALID_SESSION_NUMBER",
            CaptureError::SessionExists { .. } => "SESSION_EXISTS",
            CaptureError::SessionMismatch { .. } => "SESSION_MISMATCH",
            CaptureError::Config(_) => "CONFIG_ERROR",
        }
    }
}

/// Result type alias using CaptureError
pub type CaptureResult<T> = Result<T, CaptureError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct_per_kind() {
        let degenerate = CaptureError::DegeneratePose { norm: 0.0 };
        let transition = CaptureError::InvalidTransition {
            operation: "set phrase",
            state: "writing",
        };

        assert_eq!(degenerate.code(), "DEGENERATE_POSE");
        assert_eq!(transition.code(), "INVALID_TRANSITION");
        assert_eq!(
            transition.to_string(),
            "Invalid transition: cannot set phrase while writing"
        );
    }
}
