//! Port for the external text-generation collaborator.

use async_trait::async_trait;

use crate::domain::errors::GeneratorError;
use crate::domain::models::GenerationParams;

/// Opaque context handed to the generator alongside the parameter set.
///
/// Prompt construction lives outside the core; the engine only supplies
/// identifiers and numeric/enumerated knobs.
#[derive(Debug, Clone)]
pub struct PromptContext {
    pub topic_id: String,
    pub component_kind: String,
    /// Free-form briefing text the backend may interpolate.
    pub brief: String,
}

impl PromptContext {
    pub fn new(
        topic_id: impl Into<String>,
        component_kind: impl Into<String>,
        brief: impl Into<String>,
    ) -> Self {
        Self {
            topic_id: topic_id.into(),
            component_kind: component_kind.into(),
            brief: brief.into(),
        }
    }
}

/// Black box turning a prompt context and a parameter set into text.
///
/// The collaborator performs no silent retries of its own; all retry
/// policy belongs to the session orchestrator.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        context: &PromptContext,
        parameters: &GenerationParams,
    ) -> Result<String, GeneratorError>;
}
