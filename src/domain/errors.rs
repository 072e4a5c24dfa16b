//! Domain errors for the Quillgate engine.

use thiserror::Error;

/// The external text-generation collaborator failed to produce content.
///
/// Recoverable: a generation failure consumes one attempt and the session
/// retries if attempts remain.
#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("generation backend failed: {0}")]
    Backend(String),

    #[error("generation timed out after {0} ms")]
    Timeout(u64),
}

/// A scoring function raised instead of returning a score.
///
/// Not recoverable by retrying the same candidate: a missing score must
/// never be treated as passing or failing, so the session aborts.
#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("scorer '{dimension}' failed: {reason}")]
    ScorerFailed { dimension: String, reason: String },

    #[error("scorer '{dimension}' returned {value} outside [0, 10]")]
    ScoreOutOfRange { dimension: String, value: f64 },

    #[error("no threshold schedule configured for dimension '{0}'")]
    MissingSchedule(String),
}

/// A feedback store write or read failed.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("feedback store query failed: {0}")]
    QueryFailed(#[from] sqlx::Error),

    #[error("feedback record serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("feedback record parse error: {0}")]
    ParseError(String),
}

/// Strategy selection could not produce a remediation.
///
/// Configuration validation rules these out for well-formed catalogs; the
/// selector still reports them rather than guessing.
#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("no fix strategy is applicable to failure type '{0}'")]
    NoApplicableStrategy(String),

    #[error("no default fix strategy declared for failure type '{0}'")]
    NoDefaultStrategy(String),
}

/// Terminal session failures surfaced to the caller.
///
/// Running out of attempts is NOT an error: exhaustion is an anticipated
/// outcome and is returned as a structured report instead.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error("session cancelled before completion")]
    Cancelled,
}

pub type SessionResult<T> = Result<T, SessionError>;
