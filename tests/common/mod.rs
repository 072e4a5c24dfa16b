//! Shared test fixtures: scripted generator, canned scorers, and engine
//! construction against a temporary `SQLite` database.

use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use tempfile::TempDir;

use quillgate::domain::errors::{EvaluationError, GeneratorError};
use quillgate::domain::models::{Config, GenerationParams, ParamValue};
use quillgate::domain::ports::{DimensionScorer, FeedbackStore, PromptContext, TextGenerator};
use quillgate::infrastructure::database::{DatabaseConnection, SqliteFeedbackStore};
use quillgate::{GenerationEngine, SessionRequest};

/// Generator replaying a scripted sequence of results, one per call.
pub struct ScriptedGenerator {
    script: Mutex<Vec<Result<String, GeneratorError>>>,
}

impl ScriptedGenerator {
    pub fn new(script: Vec<Result<String, GeneratorError>>) -> Self {
        Self {
            script: Mutex::new(script),
        }
    }

    pub fn passing(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok((*t).to_string())).collect())
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(
        &self,
        _context: &PromptContext,
        _parameters: &GenerationParams,
    ) -> Result<String, GeneratorError> {
        let mut script = self.script.lock().unwrap();
        if script.is_empty() {
            return Err(GeneratorError::Backend("script exhausted".to_string()));
        }
        script.remove(0)
    }
}

/// Scorer that always returns the same value.
pub struct StaticScorer {
    name: String,
    value: f64,
}

impl StaticScorer {
    pub fn boxed(name: &str, value: f64) -> Box<dyn DimensionScorer> {
        Box::new(Self {
            name: name.to_string(),
            value,
        })
    }
}

impl DimensionScorer for StaticScorer {
    fn name(&self) -> &str {
        &self.name
    }

    fn score(&self, _text: &str) -> Result<f64, EvaluationError> {
        Ok(self.value)
    }
}

/// Scorer replaying one value per call, repeating the last.
pub struct SequenceScorer {
    name: String,
    values: Mutex<Vec<f64>>,
}

impl SequenceScorer {
    pub fn boxed(name: &str, values: &[f64]) -> Box<dyn DimensionScorer> {
        Box::new(Self {
            name: name.to_string(),
            values: Mutex::new(values.to_vec()),
        })
    }
}

impl DimensionScorer for SequenceScorer {
    fn name(&self) -> &str {
        &self.name
    }

    fn score(&self, _text: &str) -> Result<f64, EvaluationError> {
        let mut values = self.values.lock().unwrap();
        if values.len() > 1 {
            Ok(values.remove(0))
        } else {
            Ok(values.first().copied().unwrap_or(0.0))
        }
    }
}

/// Scorers that clear every default gate.
pub fn passing_scorers() -> Vec<Box<dyn DimensionScorer>> {
    vec![
        StaticScorer::boxed("ai_detection", 8.0),
        StaticScorer::boxed("realism", 8.0),
        StaticScorer::boxed("voice_authenticity", 8.0),
        StaticScorer::boxed("tonal_consistency", 8.0),
    ]
}

/// A feedback store over a fresh temporary database. The directory must
/// outlive the store.
pub async fn sqlite_store() -> (TempDir, Arc<SqliteFeedbackStore>) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let url = format!("sqlite:{}/quillgate.db", dir.path().display());
    let db = DatabaseConnection::new(&url, 5)
        .await
        .expect("failed to open database");
    db.migrate().await.expect("failed to run migrations");
    (dir, Arc::new(SqliteFeedbackStore::new(db.pool().clone())))
}

/// Engine wired to scripted collaborators and a shared store.
pub fn engine(
    config: &Config,
    generator: ScriptedGenerator,
    scorers: Vec<Box<dyn DimensionScorer>>,
    store: Arc<dyn FeedbackStore>,
) -> GenerationEngine {
    GenerationEngine::new(config, Arc::new(generator), scorers, store)
}

pub fn request(topic: &str, kind: &str) -> SessionRequest {
    SessionRequest {
        prompt: PromptContext::new(topic, kind, "write something convincing"),
        initial_parameters: GenerationParams::new()
            .with("temperature", ParamValue::Number(0.7))
            .with("detail_level", ParamValue::Number(2.0)),
    }
}
