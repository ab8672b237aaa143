//! Error types.
//!
//! - `PlateError` is what the library returns for whole-plate failures
//!   (shape and configuration problems). Single-curve failures never become
//!   errors; they are absorbed into per-cell issues by the pipeline.
//! - `AppError` is the binary's error: a message plus the process exit code.

/// Whole-plate failures surfaced before (or instead of) any computation.
#[derive(Debug, thiserror::Error)]
pub enum PlateError {
    /// The raw matrix or the conditions do not describe the same plate.
    #[error("data shape error: {0}")]
    DataShape(String),

    /// A configuration value is unknown or out of range.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Reading or writing a plate document / export failed.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A plate document is not valid JSON for our schema.
    #[error("invalid plate document: {0}")]
    Json(#[from] serde_json::Error),
}

impl PlateError {
    pub fn shape(message: impl Into<String>) -> Self {
        Self::DataShape(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    /// Exit code used when this error terminates the binary.
    pub fn exit_code(&self) -> u8 {
        match self {
            PlateError::Configuration(_) => 2,
            PlateError::DataShape(_) => 3,
            PlateError::Io { .. } | PlateError::Json(_) => 4,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<PlateError> for AppError {
    fn from(err: PlateError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
