//! Attempt-indexed threshold schedules.
//!
//! A schedule is data, not code: the quality bar may tighten with more
//! attempts, loosen, or stay flat. No direction is assumed.

use serde::{Deserialize, Serialize};

/// One step of a schedule: the threshold applied to every attempt index
/// up to (and including) `up_to`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ThresholdStep {
    pub up_to: u32,
    pub threshold: f64,
}

/// Ordered list of `(attempt_index_upper_bound, threshold)` pairs for one
/// dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThresholdSchedule {
    steps: Vec<ThresholdStep>,
}

impl ThresholdSchedule {
    /// Build a schedule from `(up_to, threshold)` pairs.
    pub fn new(steps: Vec<ThresholdStep>) -> Self {
        Self { steps }
    }

    pub fn from_pairs(pairs: &[(u32, f64)]) -> Self {
        Self::new(
            pairs
                .iter()
                .map(|&(up_to, threshold)| ThresholdStep { up_to, threshold })
                .collect(),
        )
    }

    pub fn steps(&self) -> &[ThresholdStep] {
        &self.steps
    }

    /// Minimum passing score for the given attempt.
    ///
    /// Returns the value of the first bound >= `attempt_index`, clamped
    /// to the last entry for attempts beyond the schedule's range.
    /// `None` only for an empty schedule, which validation rejects.
    pub fn threshold_for(&self, attempt_index: u32) -> Option<f64> {
        self.steps
            .iter()
            .find(|step| step.up_to >= attempt_index)
            .or_else(|| self.steps.last())
            .map(|step| step.threshold)
    }

    /// Bounds must be strictly increasing and the schedule non-empty.
    pub fn is_well_formed(&self) -> bool {
        !self.steps.is_empty() && self.steps.windows(2).all(|w| w[0].up_to < w[1].up_to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_lookup_scenario_a() {
        // ai_detection: [(3, 4.0), (6, 6.5), (99, 7.0)]
        let schedule = ThresholdSchedule::from_pairs(&[(3, 4.0), (6, 6.5), (99, 7.0)]);

        assert_eq!(schedule.threshold_for(1), Some(4.0));
        assert_eq!(schedule.threshold_for(2), Some(4.0));
        assert_eq!(schedule.threshold_for(3), Some(4.0));
        assert_eq!(schedule.threshold_for(4), Some(6.5));
        assert_eq!(schedule.threshold_for(6), Some(6.5));
        assert_eq!(schedule.threshold_for(7), Some(7.0));
    }

    #[test]
    fn test_threshold_clamps_past_last_bound() {
        let schedule = ThresholdSchedule::from_pairs(&[(2, 5.0), (4, 6.0)]);
        assert_eq!(schedule.threshold_for(50), Some(6.0));
    }

    #[test]
    fn test_loosening_schedule_is_legal() {
        // Starts strict, loosens: direction is data, not policy.
        let schedule = ThresholdSchedule::from_pairs(&[(2, 8.0), (5, 6.0)]);
        assert!(schedule.is_well_formed());
        assert_eq!(schedule.threshold_for(1), Some(8.0));
        assert_eq!(schedule.threshold_for(5), Some(6.0));
    }

    #[test]
    fn test_well_formed_rejects_unordered_bounds() {
        let schedule = ThresholdSchedule::from_pairs(&[(5, 4.0), (3, 6.0)]);
        assert!(!schedule.is_well_formed());
        assert!(!ThresholdSchedule::new(vec![]).is_well_formed());
    }

    #[test]
    fn test_lookup_is_deterministic() {
        let schedule = ThresholdSchedule::from_pairs(&[(3, 4.0), (6, 6.5)]);
        for attempt in 1..10 {
            assert_eq!(
                schedule.threshold_for(attempt),
                schedule.threshold_for(attempt)
            );
        }
    }
}
