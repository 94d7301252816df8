//! Error types.
//!
//! - `AppError`: process-level failures of the `labkib` binary (carries an exit code)
//! - `LabError`: per-request failures of a simulation round

use thiserror::Error;

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

impl From<LabError> for AppError {
    fn from(err: LabError) -> Self {
        let exit_code = match err {
            LabError::Parse { .. } | LabError::EmptyInput | LabError::Validation(_) => 2,
            LabError::Generation(_) => 3,
            LabError::Render(_) | LabError::Storage(_) => 4,
        };
        AppError::new(exit_code, err.to_string())
    }
}

/// Failure of a single simulation round.
///
/// None of these are retried; the request that produced one is answered with a
/// short diagnostic and no artifacts are left referenced.
#[derive(Debug, Error)]
pub enum LabError {
    /// A submitted cell or scalar field could not be decoded.
    #[error("{location}: {message}")]
    Parse { location: String, message: String },

    /// The trial table carried no observations.
    #[error("no data")]
    EmptyInput,

    /// Well-formed input that violates a domain rule (e.g. a one-word name).
    #[error("{0}")]
    Validation(String),

    /// Ground-truth sampling could not satisfy its constraints.
    #[error("ground truth generation failed: {0}")]
    Generation(String),

    #[error("chart rendering failed: {0}")]
    Render(String),

    #[error("artifact storage failed: {0}")]
    Storage(#[from] std::io::Error),
}

impl LabError {
    pub fn parse(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            location: location.into(),
            message: message.into(),
        }
    }
}
