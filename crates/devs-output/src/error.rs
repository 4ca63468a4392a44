//! Error types for devs-output.

use thiserror::Error;

/// Failures of an output backend.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("output I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV output error: {0}")]
    Csv(#[from] csv::Error),
}

/// Alias for `Result<T, OutputError>`.
pub type OutputResult<T> = Result<T, OutputError>;
