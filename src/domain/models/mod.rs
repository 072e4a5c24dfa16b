//! Pure domain models for the quality-gated generation engine.

pub mod attempt;
pub mod config;
pub mod evaluation;
pub mod fingerprint;
pub mod strategy;
pub mod threshold;

pub use attempt::{Attempt, GenerationParams, ParamValue, Verdict};
pub use config::{Config, DatabaseConfig, DiversityConfig, LoggingConfig, PatternRule};
pub use evaluation::{EvaluationResult, FeedbackRecord, STRUCTURAL_DIVERSITY};
pub use fingerprint::{DiversityWindow, StructuralFingerprint};
pub use strategy::{DeltaOp, FixStrategy, ParameterDelta, StatKey, StrategyStatistics};
pub use threshold::{ThresholdSchedule, ThresholdStep};
