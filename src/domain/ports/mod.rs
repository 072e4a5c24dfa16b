//! Port traits: the seams between the core engine and its collaborators.

pub mod feedback_store;
pub mod generator;
pub mod memory_feedback;
pub mod scorer;

pub use feedback_store::FeedbackStore;
pub use generator::{PromptContext, TextGenerator};
pub use memory_feedback::InMemoryFeedbackStore;
pub use scorer::DimensionScorer;
