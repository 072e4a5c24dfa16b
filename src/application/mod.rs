//! Application layer: the session orchestrator.

pub mod session;

pub use session::{
    GenerationEngine, SessionOutcome, SessionReport, SessionRequest,
};
