//! Evaluation result and feedback record models.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::attempt::{Attempt, GenerationParams, Verdict};

/// Dimension name reserved for the diversity gate.
///
/// Unlike the per-candidate dimensions, its score depends on the rolling
/// window of recently accepted outputs, so it is computed last.
pub const STRUCTURAL_DIVERSITY: &str = "structural_diversity";

/// Multi-dimensional score bundle for one candidate.
///
/// Every evaluated dimension has exactly one score in [0, 10]; scores are
/// immutable once computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub dimension_scores: BTreeMap<String, f64>,
    /// The single worst-margin failing dimension, or `None` when every
    /// gate passed. Used to target remediation.
    pub failure_type: Option<String>,
}

impl EvaluationResult {
    pub fn passed(&self) -> bool {
        self.failure_type.is_none()
    }

    pub fn score(&self, dimension: &str) -> Option<f64> {
        self.dimension_scores.get(dimension).copied()
    }
}

/// The persisted form of an [`Attempt`] plus session metadata.
///
/// Write-once: the feedback store is append-only for records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub session_id: Uuid,
    pub topic_id: String,
    pub component_kind: String,
    pub attempt_index: u32,
    pub recorded_at: DateTime<Utc>,
    pub parameters: GenerationParams,
    pub dimension_scores: BTreeMap<String, f64>,
    pub failure_type: Option<String>,
    pub verdict: Verdict,
    pub strategy_applied: Option<String>,
}

impl FeedbackRecord {
    /// Build the persisted row for a decided attempt.
    pub fn from_attempt(attempt: &Attempt, topic_id: &str, component_kind: &str) -> Self {
        let (dimension_scores, failure_type) = match &attempt.evaluation {
            Some(eval) => (eval.dimension_scores.clone(), eval.failure_type.clone()),
            None => (BTreeMap::new(), None),
        };

        Self {
            session_id: attempt.session_id,
            topic_id: topic_id.to_string(),
            component_kind: component_kind.to_string(),
            attempt_index: attempt.attempt_index,
            recorded_at: Utc::now(),
            parameters: attempt.parameters.clone(),
            dimension_scores,
            failure_type,
            verdict: attempt.verdict,
            strategy_applied: attempt.strategy_applied.clone(),
        }
    }
}
