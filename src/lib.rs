//! Quillgate: an adaptive quality-gated text generation engine.
//!
//! Wraps an external text generator in a bounded retry loop. Each
//! candidate is scored across several quality dimensions, gated against
//! attempt-indexed thresholds, and checked for structural novelty against
//! recently accepted outputs. Failed attempts are remediated by discrete,
//! named fix strategies whose outcomes are recorded, so strategy
//! selection improves as evidence accumulates.
//!
//! # Architecture
//!
//! The crate follows a ports-and-adapters layout:
//! - `domain`: pure models, error types, and the port traits
//! - `services`: evaluator, threshold policy, diversity tracker, and
//!   strategy selection
//! - `application`: the session orchestrator state machine
//! - `infrastructure`: `SQLite` persistence, configuration, logging
//! - `cli`: operator commands over the durable state

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

pub use application::{GenerationEngine, SessionOutcome, SessionReport, SessionRequest};
pub use domain::errors::{SessionError, SessionResult};
pub use domain::models::Config;
pub use domain::ports::{DimensionScorer, FeedbackStore, PromptContext, TextGenerator};
