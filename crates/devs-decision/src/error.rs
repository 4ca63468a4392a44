use thiserror::Error;

use devs_core::DevsError;

#[derive(Debug, Error)]
pub enum DecisionError {
    // ── Plan text ─────────────────────────────────────────────────────────
    #[error("plan syntax error at {line}:{column}: {message}")]
    Syntax {
        line:    usize,
        column:  usize,
        message: String,
    },

    // ── Configuration (load time) ─────────────────────────────────────────
    #[error("{0} needs an identifier")]
    MissingId(&'static str),

    #[error("precedence needs a {0:?} activity")]
    MissingEndpoint(&'static str),

    #[error("unknown rule {0:?}")]
    UnknownRule(String),

    #[error("unknown predicate {0:?}")]
    UnknownPredicate(String),

    #[error("unknown fact {0:?}")]
    UnknownFact(String),

    #[error("unknown {kind} function {name:?}")]
    UnknownCallback {
        kind: &'static str,
        name: String,
    },

    #[error("unknown activity {0:?}")]
    UnknownActivity(String),

    #[error("activity {0:?} already exists")]
    DuplicateActivity(String),

    #[error("unknown precedence type {0:?}")]
    UnknownPrecedenceType(String),

    #[error("precedence needs a type")]
    MissingPrecedenceType,

    #[error("invalid time lags: mintimelag ({min}) must be >= 0 and <= maxtimelag ({max})")]
    InvalidTimeLag {
        min: f64,
        max: f64,
    },

    #[error("invalid temporal constraint for activity {activity:?}: {message}")]
    InvalidTemporal {
        activity: String,
        message:  String,
    },

    #[error("invalid acknowledgement: {0}")]
    InvalidAck(String),

    // ── Internal (recursion bookkeeping) ──────────────────────────────────
    #[error("internal decision error: {0}")]
    Internal(String),
}

pub type DecisionResult<T> = Result<T, DecisionError>;

impl DecisionError {
    /// Errors caused by the plan or the registries, detected at load time.
    pub fn is_config(&self) -> bool {
        !matches!(self, DecisionError::Internal(_) | DecisionError::InvalidAck(_))
    }

    /// Errors that signal a corrupt recursion parameter bag or a misnamed
    /// generated activity.
    pub fn is_internal(&self) -> bool {
        matches!(self, DecisionError::Internal(_))
    }
}

impl From<DevsError> for DecisionError {
    fn from(err: DevsError) -> Self {
        DecisionError::Internal(err.to_string())
    }
}
