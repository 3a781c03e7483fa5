//! Error types for the parsing and interpreter layers.
//!
//! Uses [`thiserror`] for ergonomic error derivation. Provides [`BackendError`]
//! that wraps backend-specific errors and converts them to [`CutterMapError`].

use cuttermap_core::CutterMapError;
use thiserror::Error;

/// Error type for PDF parsing backend operations.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Error from PDF parsing (structure, syntax, object resolution).
    #[error("PDF parse error: {0}")]
    Parse(String),

    /// Error reading PDF data.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error resolving font or encoding information.
    #[error("font error: {0}")]
    Font(String),

    /// Error during content stream interpretation.
    #[error("interpreter error: {0}")]
    Interpreter(String),

    /// A core library error.
    #[error(transparent)]
    Core(#[from] CutterMapError),
}

impl From<BackendError> for CutterMapError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Parse(msg) => CutterMapError::ParseError(msg),
            BackendError::Io(e) => CutterMapError::IoError(e.to_string()),
            BackendError::Font(msg) => CutterMapError::ParseError(format!("font: {msg}")),
            BackendError::Interpreter(msg) => CutterMapError::ParseError(msg),
            BackendError::Core(e) => e,
        }
    }
}

impl From<lopdf::Error> for BackendError {
    fn from(err: lopdf::Error) -> Self {
        BackendError::Parse(err.to_string())
    }
}
