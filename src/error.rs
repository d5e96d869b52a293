//! Error handling for Stemperator
//!
//! Every fatal condition maps to one `StemError` variant with a stable code and
//! recovery suggestions. Device fallback and unmatched outputs are not errors;
//! they surface as warnings on the diagnostic channel.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for Stemperator operations
pub type Result<T> = std::result::Result<T, StemError>;

/// Main error type for Stemperator operations
#[derive(Error, Debug)]
pub enum StemError {
    // Pre-flight Errors
    #[error("Missing dependency: {component} ({detail})")]
    MissingDependency { component: String, detail: String },

    #[error("Input file not found: {path}")]
    InputNotFound { path: PathBuf },

    #[error("Invalid arguments: {reason}")]
    InvalidArguments { reason: String },

    // Foreign Call Errors
    #[error("Separator bridge error: {reason}")]
    Bridge { reason: String },

    #[error("Failed to load model {model}: {reason}")]
    ModelLoad { model: String, reason: String },

    #[error("Separation failed: {reason}")]
    Separation { reason: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StemError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            StemError::MissingDependency { .. } => "MISSING_DEPENDENCY",
            StemError::InputNotFound { .. } => "INPUT_NOT_FOUND",
            StemError::InvalidArguments { .. } => "INVALID_ARGUMENTS",
            StemError::Bridge { .. } => "BRIDGE_ERROR",
            StemError::ModelLoad { .. } => "MODEL_LOAD_FAILED",
            StemError::Separation { .. } => "SEPARATION_FAILED",
            StemError::Io(_) => "IO_ERROR",
            StemError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Whether this error is raised before any progress line is written
    pub fn is_preflight(&self) -> bool {
        matches!(
            self,
            StemError::MissingDependency { .. }
                | StemError::InputNotFound { .. }
                | StemError::InvalidArguments { .. }
        )
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            StemError::MissingDependency { .. } => vec![
                "Install with: pip install audio-separator[gpu]",
                "For CPU-only hosts: pip install audio-separator[cpu]",
                "Point STEMPERATOR_PYTHON at the interpreter that has the packages installed",
            ],
            StemError::InputNotFound { .. } => vec![
                "Check the input path is correct",
                "Verify the file hasn't been moved or deleted",
            ],
            StemError::InvalidArguments { .. } => vec!["Run with --help for usage"],
            StemError::ModelLoad { .. } => vec![
                "Run with --list-models to see supported models",
                "The first run downloads model weights; check network access",
                "Try --device cpu if the GPU runtime is misconfigured",
            ],
            StemError::Separation { .. } => vec![
                "Try --device cpu if the GPU ran out of memory",
                "Convert the input to WAV and try again",
            ],
            StemError::Bridge { .. } => vec![
                "Run with --check to verify the Python installation",
                "Run with -v for bridge diagnostics",
            ],
            _ => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = StemError::InputNotFound {
            path: PathBuf::from("missing.wav"),
        };
        assert_eq!(err.error_code(), "INPUT_NOT_FOUND");
        assert!(err.is_preflight());
    }

    #[test]
    fn test_foreign_failures_are_not_preflight() {
        let err = StemError::Separation {
            reason: "CUDA out of memory".to_string(),
        };
        assert!(!err.is_preflight());
        assert!(!err.recovery_suggestions().is_empty());
    }

    #[test]
    fn test_missing_dependency_has_install_guidance() {
        let err = StemError::MissingDependency {
            component: "audio_separator".to_string(),
            detail: "No module named 'audio_separator'".to_string(),
        };
        assert!(err
            .recovery_suggestions()
            .iter()
            .any(|s| s.contains("pip install")));
    }
}
