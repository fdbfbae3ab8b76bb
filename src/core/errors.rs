//! Shared error types for the application

use std::path::PathBuf;
use thiserror::Error;

use crate::observability::VerificationPhase;

/// Main error type for doublecheck operations.
///
/// Per-call verification failures are never represented here: those are
/// recovered locally and attached to the offending call
/// (see [`crate::method_call::VerificationError`]). This type covers the
/// failures that abort a run.
#[derive(Debug, Error)]
pub enum Error {
    /// Harness misconfiguration (unknown checker, missing checker, bad strategy)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Tracer lifecycle misuse
    #[error("Tracer error: {0}")]
    Tracer(String),

    /// A lifecycle phase was entered twice or out of order
    #[error("Cannot enter phase {to} from {from}")]
    Phase {
        from: VerificationPhase,
        to: VerificationPhase,
    },

    /// Signature file or type expression could not be parsed
    #[error("Signature error in {}: {message}", source_name.as_deref().unwrap_or("<inline>"))]
    Signature {
        message: String,
        source_name: Option<String>,
    },

    /// A call record was completed twice
    #[error("Return value already recorded for {0}")]
    AlreadyCompleted(String),

    /// Recorded call data could not be interpreted
    #[error("Recording error: {0}")]
    Recording(String),

    /// File system related errors
    #[error("File system error: {message}")]
    FileSystem {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Generic errors with context
    #[error("{context}: {message}")]
    WithContext { context: String, message: String },

    /// IO errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// TOML errors
    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    /// Pattern errors
    #[error(transparent)]
    Pattern(#[from] regex::Error),
}

impl Error {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a file system error with path context
    pub fn file_system(
        message: impl Into<String>,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::FileSystem {
            message: message.into(),
            path: Some(path.into()),
            source: Some(source),
        }
    }

    /// Create a signature parse error, optionally naming the file it came from
    pub fn signature(message: impl Into<String>, source_name: Option<String>) -> Self {
        Self::Signature {
            message: message.into(),
            source_name,
        }
    }

    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            message: self.to_string(),
        }
    }
}

/// Result type alias using our error type
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}
