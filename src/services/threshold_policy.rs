//! Adaptive threshold policy.
//!
//! Looks up the per-dimension schedule for an attempt index and decides
//! whether a candidate's scores clear every gate. When gates fail, the
//! failure type is the single lowest-margin failing dimension, with ties
//! broken by the configured dimension priority order, so remediation stays
//! targeted at one dimension instead of chasing everything at once.

use std::collections::BTreeMap;

use crate::domain::errors::EvaluationError;
use crate::domain::models::ThresholdSchedule;

/// Outcome of gating one candidate at one attempt index.
#[derive(Debug, Clone, PartialEq)]
pub enum GateOutcome {
    Passed,
    Failed {
        failure_type: String,
        /// `score - threshold` of the classifying dimension (negative).
        margin: f64,
    },
}

impl GateOutcome {
    pub fn passed(&self) -> bool {
        matches!(self, Self::Passed)
    }

    pub fn failure_type(&self) -> Option<&str> {
        match self {
            Self::Passed => None,
            Self::Failed { failure_type, .. } => Some(failure_type),
        }
    }
}

/// Per-dimension schedules plus the tie-break priority order.
#[derive(Debug, Clone)]
pub struct ThresholdPolicy {
    schedules: BTreeMap<String, ThresholdSchedule>,
    priority: Vec<String>,
}

impl ThresholdPolicy {
    pub fn new(schedules: BTreeMap<String, ThresholdSchedule>, priority: Vec<String>) -> Self {
        Self { schedules, priority }
    }

    /// Minimum passing score for `dimension` at `attempt_index`.
    ///
    /// Pure: identical inputs against an unchanged schedule always yield
    /// identical output.
    pub fn threshold_for(
        &self,
        dimension: &str,
        attempt_index: u32,
    ) -> Result<f64, EvaluationError> {
        self.schedules
            .get(dimension)
            .and_then(|schedule| schedule.threshold_for(attempt_index))
            .ok_or_else(|| EvaluationError::MissingSchedule(dimension.to_string()))
    }

    /// Gate every scored dimension; derive the failure type when any gate
    /// fails.
    pub fn classify(
        &self,
        scores: &BTreeMap<String, f64>,
        attempt_index: u32,
    ) -> Result<GateOutcome, EvaluationError> {
        let mut worst: Option<(f64, usize, &str)> = None;

        for (dimension, &score) in scores {
            let threshold = self.threshold_for(dimension, attempt_index)?;
            let margin = score - threshold;
            if margin >= 0.0 {
                continue;
            }

            let rank = self.priority_rank(dimension);
            let candidate = (margin, rank, dimension.as_str());
            worst = Some(match worst {
                None => candidate,
                Some(current) => {
                    // smallest margin wins; ties fall to the declared
                    // priority order, then name for full determinism
                    if (candidate.0, candidate.1, candidate.2) < (current.0, current.1, current.2) {
                        candidate
                    } else {
                        current
                    }
                }
            });
        }

        Ok(match worst {
            None => GateOutcome::Passed,
            Some((margin, _, dimension)) => GateOutcome::Failed {
                failure_type: dimension.to_string(),
                margin,
            },
        })
    }

    fn priority_rank(&self, dimension: &str) -> usize {
        self.priority
            .iter()
            .position(|d| d == dimension)
            .unwrap_or(self.priority.len())
    }
}
