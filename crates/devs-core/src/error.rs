//! Framework error type.
//!
//! Sub-crates define their own error enums and convert `DevsError` into them
//! via `From` impls where a core operation can fail underneath them.

use thiserror::Error;

/// The error type for `devs-core` operations.
#[derive(Debug, Error)]
pub enum DevsError {
    #[error("expected a {expected} value, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found:    &'static str,
    },

    #[error("missing key {0:?}")]
    MissingKey(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("parse error: {0}")]
    Parse(String),
}

/// Shorthand result type for `devs-core`.
pub type DevsResult<T> = Result<T, DevsError>;
