//! Fix strategies: named, discrete parameter-adjustment rules, plus the
//! aggregate statistics learned about their outcomes.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::attempt::{GenerationParams, ParamValue};

/// A single parameter adjustment within a strategy's delta table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ParameterDelta {
    /// Name of the knob this delta adjusts.
    pub parameter: String,
    pub op: DeltaOp,
    /// Lower clamp applied after a numeric adjustment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Upper clamp applied after a numeric adjustment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

/// Adjustment operation applied to one parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeltaOp {
    /// Add to the current numeric value. No-op for enumerated knobs.
    Add(f64),
    /// Multiply the current numeric value. No-op for enumerated knobs.
    Scale(f64),
    /// Replace (or introduce) the value outright.
    Set(ParamValue),
}

impl ParameterDelta {
    /// Apply this delta to one parameter set entry.
    fn apply(&self, params: &mut GenerationParams) {
        let next = match &self.op {
            DeltaOp::Set(value) => Some(value.clone()),
            DeltaOp::Add(amount) => params
                .number(&self.parameter)
                .map(|current| ParamValue::Number(self.clamp(current + amount))),
            DeltaOp::Scale(factor) => params
                .number(&self.parameter)
                .map(|current| ParamValue::Number(self.clamp(current * factor))),
        };

        if let Some(value) = next {
            params.set(self.parameter.clone(), value);
        }
    }

    fn clamp(&self, value: f64) -> f64 {
        let low = self.min.unwrap_or(f64::NEG_INFINITY);
        let high = self.max.unwrap_or(f64::INFINITY);
        value.clamp(low, high)
    }
}

/// A named, discrete remediation.
///
/// Strategies are configuration data plus a pure transform; they never
/// read or write the feedback store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixStrategy {
    /// Stable identifier, never reused.
    pub id: String,
    pub name: String,
    /// Failure types (dimension names) this strategy can remediate.
    pub applicable_failure_types: BTreeSet<String>,
    pub deltas: Vec<ParameterDelta>,
}

impl FixStrategy {
    pub fn applies_to(&self, failure_type: &str) -> bool {
        self.applicable_failure_types.contains(failure_type)
    }

    /// Produce the next attempt's parameters. Pure and deterministic
    /// given the declared delta table.
    pub fn apply(&self, current: &GenerationParams) -> GenerationParams {
        let mut next = current.clone();
        for delta in &self.deltas {
            delta.apply(&mut next);
        }
        next
    }
}

/// Key for one learned statistics bucket.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StatKey {
    pub strategy_id: String,
    pub failure_type: String,
}

impl StatKey {
    pub fn new(strategy_id: impl Into<String>, failure_type: impl Into<String>) -> Self {
        Self {
            strategy_id: strategy_id.into(),
            failure_type: failure_type.into(),
        }
    }
}

/// Aggregate learned outcome for a (strategy, failure type) pair.
///
/// Maintained by append-only counter increments, never recomputed from a
/// full history scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StrategyStatistics {
    pub attempts_count: u64,
    pub successes_count: u64,
    pub sum_score_improvement: f64,
}

impl StrategyStatistics {
    /// Fraction of remediations that cleared the targeted gate; 0 when no
    /// attempts have been recorded.
    pub fn success_rate(&self) -> f64 {
        if self.attempts_count == 0 {
            0.0
        } else {
            self.successes_count as f64 / self.attempts_count as f64
        }
    }

    pub fn avg_improvement(&self) -> f64 {
        if self.attempts_count == 0 {
            0.0
        } else {
            self.sum_score_improvement / self.attempts_count as f64
        }
    }
}
