use std::fmt;

use devs_core::Time;
use thiserror::Error;

/// Error returned by a model's transition functions.
///
/// Boxed so that extensions (the decision agent, user models) can surface
/// their own error types unchanged.
pub type ModelError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("simulation configuration error: {0}")]
    Config(String),

    #[error("duplicate model name {name:?} in coupled model {coupled:?}")]
    DuplicateModel {
        coupled: String,
        name:    String,
    },

    #[error("connection in coupled model {coupled:?} references unknown model {model:?}")]
    UnknownModel {
        coupled: String,
        model:   String,
    },

    #[error("observable references unknown model {0:?}")]
    UnknownObservable(String),

    #[error("observable references unknown view {0:?}")]
    UnknownView(String),

    #[error("coupling loop through the boundary of coupled model {0:?}")]
    CouplingLoop(String),

    #[error("model {model:?} failed at t={time}: {source}")]
    Model {
        model:  String,
        time:   Time,
        #[source]
        source: ModelError,
    },

    #[error("model {model:?} returned invalid time advance {ta} at t={time}")]
    InvalidTimeAdvance {
        model: String,
        time:  Time,
        ta:    Time,
    },
}

pub type SimResult<T> = Result<T, SimError>;

impl SimError {
    /// Stable short code for the error class.
    pub fn code(&self) -> &'static str {
        match self {
            SimError::Config(_)
            | SimError::DuplicateModel { .. }
            | SimError::UnknownModel { .. }
            | SimError::UnknownObservable(_)
            | SimError::UnknownView(_)
            | SimError::CouplingLoop(_) => "config",
            SimError::Model { .. } => "model",
            SimError::InvalidTimeAdvance { .. } => "time-advance",
        }
    }

    /// Flatten into the `{code, message}` record handed to whatever
    /// orchestrates the run.
    pub fn record(&self) -> ErrorRecord {
        ErrorRecord { code: self.code(), message: self.to_string() }
    }
}

/// A run failure as reported to the orchestration layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorRecord {
    pub code:    &'static str,
    pub message: String,
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}
