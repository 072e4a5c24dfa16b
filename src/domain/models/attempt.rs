//! Attempt domain model.
//!
//! One generation try within a session: the parameters it was generated
//! with, the content produced, its evaluation, and the final verdict.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::evaluation::EvaluationResult;

/// Outcome of a single attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Attempt created, not yet decided
    #[default]
    Pending,
    /// Every gated dimension cleared its threshold
    Passed,
    /// At least one dimension fell below its threshold
    Failed,
    /// The generator collaborator failed or timed out
    GenerationError,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::GenerationError => "generation_error",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "passed" => Some(Self::Passed),
            "failed" => Some(Self::Failed),
            "generation_error" => Some(Self::GenerationError),
            _ => None,
        }
    }

    /// Terminal verdicts never change once set.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// A single generation knob value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Number(f64),
    Choice(String),
}

impl ParamValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Choice(_) => None,
        }
    }
}

/// Ordered mapping of generation parameter name to value.
///
/// Parameters are numeric or enumerated knobs only; prompt text never
/// lives here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GenerationParams(BTreeMap<String, ParamValue>);

impl GenerationParams {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn set(&mut self, name: impl Into<String>, value: ParamValue) {
        self.0.insert(name.into(), value);
    }

    pub fn with(mut self, name: impl Into<String>, value: ParamValue) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    /// Numeric value of a knob, if present and numeric.
    pub fn number(&self, name: &str) -> Option<f64> {
        self.0.get(name).and_then(ParamValue::as_number)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One generation-and-evaluation cycle within a session.
///
/// Created by the orchestrator at loop start, filled once by evaluation
/// and once by the decision, then immutable. Owned exclusively by its
/// session until the session completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attempt {
    pub session_id: Uuid,
    /// 1-based position within the session, bounded by `max_attempts`.
    pub attempt_index: u32,
    pub parameters: GenerationParams,
    /// Produced text; absent when generation itself failed.
    pub content: Option<String>,
    /// Absent until the candidate has been evaluated.
    pub evaluation: Option<EvaluationResult>,
    pub verdict: Verdict,
    /// Id of the fix strategy whose deltas produced this attempt's
    /// parameters; set only on attempts that remediate a prior failure.
    pub strategy_applied: Option<String>,
    pub started_at: DateTime<Utc>,
}

impl Attempt {
    pub fn new(
        session_id: Uuid,
        attempt_index: u32,
        parameters: GenerationParams,
        strategy_applied: Option<String>,
    ) -> Self {
        Self {
            session_id,
            attempt_index,
            parameters,
            content: None,
            evaluation: None,
            verdict: Verdict::Pending,
            strategy_applied,
            started_at: Utc::now(),
        }
    }

    /// Score of this attempt's own failing dimension, used to rank
    /// failed attempts when reporting exhaustion diagnostics.
    pub fn failure_dimension_score(&self) -> Option<f64> {
        let eval = self.evaluation.as_ref()?;
        match &eval.failure_type {
            Some(dim) => eval.dimension_scores.get(dim).copied(),
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_round_trip() {
        for v in [
            Verdict::Pending,
            Verdict::Passed,
            Verdict::Failed,
            Verdict::GenerationError,
        ] {
            assert_eq!(Verdict::from_str(v.as_str()), Some(v));
        }
        assert_eq!(Verdict::from_str("nonsense"), None);
    }

    #[test]
    fn test_verdict_terminal() {
        assert!(!Verdict::Pending.is_terminal());
        assert!(Verdict::Passed.is_terminal());
        assert!(Verdict::GenerationError.is_terminal());
    }

    #[test]
    fn test_params_ordered_iteration() {
        let params = GenerationParams::new()
            .with("temperature", ParamValue::Number(0.8))
            .with("repetition_penalty", ParamValue::Number(1.1))
            .with("voice", ParamValue::Choice("casual".to_string()));

        let names: Vec<&str> = params.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, vec!["repetition_penalty", "temperature", "voice"]);
        assert_eq!(params.number("temperature"), Some(0.8));
        assert_eq!(params.number("voice"), None);
    }

    #[test]
    fn test_new_attempt_is_pending() {
        let attempt = Attempt::new(Uuid::new_v4(), 1, GenerationParams::new(), None);
        assert_eq!(attempt.verdict, Verdict::Pending);
        assert!(attempt.content.is_none());
        assert!(attempt.evaluation.is_none());
    }
}
