//! Service layer: the decision-making components of the engine.

pub mod diversity_tracker;
pub mod evaluator;
pub mod strategy_selector;
pub mod threshold_policy;

pub use diversity_tracker::{DiversityTracker, FingerprintExtractor};
pub use evaluator::Evaluator;
pub use strategy_selector::{FixStrategyRegistry, PriorApplication, StrategySelector};
pub use threshold_policy::{GateOutcome, ThresholdPolicy};
