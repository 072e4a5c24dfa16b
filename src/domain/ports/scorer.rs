//! Port for pluggable quality-dimension scorers.

use crate::domain::errors::EvaluationError;

/// One independently-scored quality axis.
///
/// Scorers are pure and side-effect free: same text, same score. The
/// engine never looks inside the heuristic; it only consumes the number.
/// Adding a dimension means registering one more scorer plus one more
/// threshold schedule entry, with no orchestrator change.
pub trait DimensionScorer: Send + Sync {
    /// Dimension name, unique across the registered set.
    fn name(&self) -> &str;

    /// Score the candidate in [0, 10]. An `Err` aborts the whole
    /// evaluation; it is never substituted with a default score.
    fn score(&self, text: &str) -> Result<f64, EvaluationError>;
}
