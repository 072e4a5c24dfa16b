//! Fix strategy registry and selector.
//!
//! The registry is configuration data: a catalog of named remediations
//! plus a declared default per failure type. Selection is a pure function
//! over the registry and a statistics snapshot; the caller records
//! outcomes afterward; nothing here touches the feedback store.

use std::collections::BTreeMap;

use tracing::debug;

use crate::domain::errors::SelectionError;
use crate::domain::models::{FixStrategy, StatKey, StrategyStatistics};

/// Catalog of fix strategies with per-failure-type defaults.
#[derive(Debug, Clone)]
pub struct FixStrategyRegistry {
    strategies: BTreeMap<String, FixStrategy>,
    defaults: BTreeMap<String, String>,
}

impl FixStrategyRegistry {
    pub fn new(strategies: Vec<FixStrategy>, defaults: BTreeMap<String, String>) -> Self {
        Self {
            strategies: strategies.into_iter().map(|s| (s.id.clone(), s)).collect(),
            defaults,
        }
    }

    pub fn get(&self, id: &str) -> Option<&FixStrategy> {
        self.strategies.get(id)
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Strategies applicable to a failure type, in id order.
    fn eligible(&self, failure_type: &str) -> Vec<&FixStrategy> {
        self.strategies
            .values()
            .filter(|s| s.applies_to(failure_type))
            .collect()
    }

    /// The declared default strategy for a failure type.
    fn default_for(&self, failure_type: &str) -> Result<&FixStrategy, SelectionError> {
        let id = self
            .defaults
            .get(failure_type)
            .ok_or_else(|| SelectionError::NoDefaultStrategy(failure_type.to_string()))?;
        self.strategies
            .get(id)
            .ok_or_else(|| SelectionError::NoDefaultStrategy(failure_type.to_string()))
    }
}

/// The strategy applied to produce the immediately preceding attempt,
/// with the length of the current same-failure-type streak.
#[derive(Debug, Clone)]
pub struct PriorApplication {
    pub strategy_id: String,
    pub failure_type: String,
    /// Consecutive failing attempts sharing this failure type, including
    /// the one just decided.
    pub consecutive_failures: u32,
}

/// Picks the remediation for an observed failure type.
#[derive(Debug, Clone)]
pub struct StrategySelector {
    registry: FixStrategyRegistry,
    exploration_floor: u32,
    minimum_sample_size: u64,
}

impl StrategySelector {
    pub fn new(
        registry: FixStrategyRegistry,
        exploration_floor: u32,
        minimum_sample_size: u64,
    ) -> Self {
        Self {
            registry,
            exploration_floor,
            minimum_sample_size,
        }
    }

    pub fn registry(&self) -> &FixStrategyRegistry {
        &self.registry
    }

    /// Select the best strategy for `failure_type` at `attempt_index`.
    ///
    /// Below the exploration floor, or when no eligible bucket has enough
    /// samples, the declared default is returned rather than ranking on
    /// thin data. Otherwise eligible strategies are ranked by success
    /// rate, then average improvement, then id. A strategy that just
    /// failed twice in a row against the same failure type is excluded so
    /// the session cannot loop on an ineffective fix; if that exclusion
    /// empties the ranking, the default is the fallback.
    pub fn select(
        &self,
        failure_type: &str,
        attempt_index: u32,
        prior: Option<&PriorApplication>,
        statistics: &BTreeMap<StatKey, StrategyStatistics>,
    ) -> Result<&FixStrategy, SelectionError> {
        let eligible = self.registry.eligible(failure_type);
        if eligible.is_empty() {
            return Err(SelectionError::NoApplicableStrategy(
                failure_type.to_string(),
            ));
        }

        let stats_for = |strategy: &FixStrategy| -> StrategyStatistics {
            statistics
                .get(&StatKey::new(strategy.id.clone(), failure_type))
                .copied()
                .unwrap_or_default()
        };

        let has_trusted_sample = eligible
            .iter()
            .any(|s| stats_for(s).attempts_count >= self.minimum_sample_size);

        if attempt_index < self.exploration_floor || !has_trusted_sample {
            let default = self.registry.default_for(failure_type)?;
            debug!(
                failure_type,
                attempt_index,
                strategy = %default.id,
                "selector below exploration floor, using default"
            );
            return Ok(default);
        }

        let excluded = prior.and_then(|p| {
            (p.failure_type == failure_type && p.consecutive_failures >= 2)
                .then_some(p.strategy_id.as_str())
        });

        let mut ranked: Vec<&FixStrategy> = eligible
            .into_iter()
            .filter(|s| Some(s.id.as_str()) != excluded)
            .collect();

        if ranked.is_empty() {
            // the excluded strategy was the only eligible one
            return self.registry.default_for(failure_type);
        }

        ranked.sort_by(|a, b| {
            let sa = stats_for(a);
            let sb = stats_for(b);
            sb.success_rate()
                .partial_cmp(&sa.success_rate())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| {
                    sb.avg_improvement()
                        .partial_cmp(&sa.avg_improvement())
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .then_with(|| a.id.cmp(&b.id))
        });

        let chosen = ranked[0];
        debug!(
            failure_type,
            attempt_index,
            strategy = %chosen.id,
            excluded = ?excluded,
            "selector ranked by learned statistics"
        );
        Ok(chosen)
    }
}
