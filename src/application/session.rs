//! Generation session orchestrator.
//!
//! Drives the bounded attempt loop as an explicit state machine:
//! `Init → Generating → Evaluating → Deciding → {Passed | Retrying |
//! Exhausted}`, with `Retrying` looping back to `Generating`. Retry
//! policy lives entirely here: the generator performs no silent retries
//! and the evaluator never retries a candidate.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::domain::errors::{SessionError, SessionResult};
use crate::domain::models::{
    Attempt, Config, EvaluationResult, FeedbackRecord, GenerationParams, StructuralFingerprint,
    Verdict, STRUCTURAL_DIVERSITY,
};
use crate::domain::ports::{DimensionScorer, FeedbackStore, PromptContext, TextGenerator};
use crate::services::{
    DiversityTracker, Evaluator, FixStrategyRegistry, PriorApplication, StrategySelector,
    ThresholdPolicy,
};

/// One session's worth of work: generate and gate one piece of content.
#[derive(Debug, Clone)]
pub struct SessionRequest {
    pub prompt: PromptContext,
    pub initial_parameters: GenerationParams,
}

/// Terminal outcome of a session.
#[derive(Debug, Clone)]
pub enum SessionOutcome {
    /// Every gate cleared; the content was accepted.
    Passed {
        content: String,
        evaluation: EvaluationResult,
    },
    /// All attempts consumed without passing. The best-scoring attempt is
    /// retained as a diagnostic artifact, never substituted as a pass.
    Exhausted { best_attempt_index: Option<u32> },
}

/// What callers receive: never a bare boolean, always the full attempt
/// history alongside the outcome.
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub session_id: Uuid,
    pub outcome: SessionOutcome,
    pub attempts: Vec<Attempt>,
}

impl SessionReport {
    pub fn passed(&self) -> bool {
        matches!(self.outcome, SessionOutcome::Passed { .. })
    }
}

/// Session loop states. Attempt-scoped data rides along with the state
/// so every transition is explicit and inspectable.
enum SessionState {
    Init,
    Generating,
    Evaluating(Attempt),
    Deciding(Attempt, BTreeMap<String, f64>),
    /// Failure context from the decided attempt; `None` after a
    /// generation error, where there is nothing to remediate.
    Retrying(Option<RetryContext>),
    Exhausted,
}

struct RetryContext {
    failure_type: String,
    /// Score of the failing dimension, baseline for measuring the
    /// selected strategy's improvement.
    failing_score: f64,
}

/// Outcome bookkeeping for a strategy applied to produce an attempt:
/// resolved when that attempt is decided, feeding the learned statistics.
struct PendingRemediation {
    strategy_id: String,
    failure_type: String,
    prior_score: f64,
}

/// The adaptive quality-gated generation engine.
///
/// Each `run_session` call is an independent, logically single-threaded
/// state machine; many sessions may run concurrently as separate tasks.
/// The only shared mutable state is the feedback store's statistics and
/// the per-component-kind diversity windows.
pub struct GenerationEngine {
    generator: Arc<dyn TextGenerator>,
    evaluator: Evaluator,
    policy: ThresholdPolicy,
    selector: StrategySelector,
    diversity: Arc<DiversityTracker>,
    store: Arc<dyn FeedbackStore>,
    max_attempts: u32,
    attempt_timeout: Duration,
    shutdown_tx: broadcast::Sender<()>,
}

impl GenerationEngine {
    pub fn new(
        config: &Config,
        generator: Arc<dyn TextGenerator>,
        scorers: Vec<Box<dyn DimensionScorer>>,
        store: Arc<dyn FeedbackStore>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let registry = FixStrategyRegistry::new(
            config.strategies.clone(),
            config.default_strategies.clone(),
        );

        Self {
            generator,
            evaluator: Evaluator::new(scorers),
            policy: ThresholdPolicy::new(
                config.thresholds.clone(),
                config.dimension_priority.clone(),
            ),
            selector: StrategySelector::new(
                registry,
                config.exploration_floor,
                config.minimum_sample_size,
            ),
            diversity: Arc::new(DiversityTracker::new(config.diversity.clone())),
            store,
            max_attempts: config.max_attempts.max(1),
            attempt_timeout: Duration::from_millis(config.attempt_timeout_ms),
            shutdown_tx,
        }
    }

    /// Shared diversity state, for inspection and tests.
    pub fn diversity_tracker(&self) -> &Arc<DiversityTracker> {
        &self.diversity
    }

    /// Signal all in-flight sessions to stop between attempts.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Run one generation session to completion.
    ///
    /// Returns `Ok` for both accepted and exhausted sessions; running
    /// out of attempts is an anticipated outcome, not an error. Scorer
    /// failures, persistence failures mid-loop, and cancellation surface
    /// as `Err`.
    #[allow(clippy::too_many_lines)]
    pub async fn run_session(&self, request: SessionRequest) -> SessionResult<SessionReport> {
        let session_id = Uuid::new_v4();
        let topic_id = request.prompt.topic_id.clone();
        let component_kind = request.prompt.component_kind.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        let mut attempts: Vec<Attempt> = Vec::new();
        let mut parameters = request.initial_parameters.clone();
        let mut attempt_index: u32 = 1;
        // strategy whose deltas produced the upcoming attempt's parameters
        let mut applied_strategy: Option<String> = None;
        let mut remediation: Option<PendingRemediation> = None;
        // (failure_type, consecutive failing attempts with it)
        let mut failure_streak: Option<(String, u32)> = None;

        info!(%session_id, topic_id, component_kind, "session starting");

        let mut state = SessionState::Init;
        loop {
            state = match state {
                SessionState::Init => SessionState::Generating,

                SessionState::Generating => {
                    if shutdown_rx.try_recv().is_ok() {
                        info!(%session_id, attempt_index, "session cancelled");
                        return Err(SessionError::Cancelled);
                    }

                    let mut attempt = Attempt::new(
                        session_id,
                        attempt_index,
                        parameters.clone(),
                        applied_strategy.take(),
                    );
                    debug!(%session_id, attempt_index, "generating candidate");

                    let generated = tokio::select! {
                        _ = shutdown_rx.recv() => {
                            info!(%session_id, attempt_index, "session cancelled mid-generation");
                            return Err(SessionError::Cancelled);
                        }
                        result = timeout(
                            self.attempt_timeout,
                            self.generator.generate(&request.prompt, &attempt.parameters),
                        ) => result,
                    };

                    match generated {
                        Ok(Ok(text)) => {
                            attempt.content = Some(text);
                            SessionState::Evaluating(attempt)
                        }
                        Ok(Err(err)) => {
                            warn!(%session_id, attempt_index, %err, "generator failed");
                            self.fail_generation(&mut attempt, &mut remediation);
                            self.store
                                .append(FeedbackRecord::from_attempt(
                                    &attempt,
                                    &topic_id,
                                    &component_kind,
                                ))
                                .await?;
                            attempts.push(attempt);
                            if attempt_index < self.max_attempts {
                                SessionState::Retrying(None)
                            } else {
                                SessionState::Exhausted
                            }
                        }
                        Err(_elapsed) => {
                            warn!(
                                %session_id,
                                attempt_index,
                                timeout_ms = self.attempt_timeout.as_millis() as u64,
                                "generator timed out"
                            );
                            self.fail_generation(&mut attempt, &mut remediation);
                            self.store
                                .append(FeedbackRecord::from_attempt(
                                    &attempt,
                                    &topic_id,
                                    &component_kind,
                                ))
                                .await?;
                            attempts.push(attempt);
                            if attempt_index < self.max_attempts {
                                SessionState::Retrying(None)
                            } else {
                                SessionState::Exhausted
                            }
                        }
                    }
                }

                SessionState::Evaluating(attempt) => {
                    let text = attempt.content.as_deref().unwrap_or_default();
                    let scores = self.evaluator.evaluate(text)?;
                    SessionState::Deciding(attempt, scores)
                }

                SessionState::Deciding(mut attempt, mut scores) => {
                    let outcome = self.policy.classify(&scores, attempt_index)?;
                    let mut failure_type = outcome.failure_type().map(ToString::to_string);

                    // Diversity reads shared state, so it runs last and
                    // only for candidates that cleared every other gate.
                    let mut fingerprint: Option<StructuralFingerprint> = None;
                    if failure_type.is_none() {
                        let text = attempt.content.as_deref().unwrap_or_default();
                        let fp = self.diversity.extract(text);
                        let diversity_score =
                            self.diversity.score_candidate(&component_kind, &fp);
                        let threshold = self
                            .policy
                            .threshold_for(STRUCTURAL_DIVERSITY, attempt_index)?;
                        scores.insert(STRUCTURAL_DIVERSITY.to_string(), diversity_score);
                        if diversity_score < threshold {
                            failure_type = Some(STRUCTURAL_DIVERSITY.to_string());
                        }
                        fingerprint = Some(fp);
                    }

                    let passed = failure_type.is_none();
                    attempt.evaluation = Some(EvaluationResult {
                        dimension_scores: scores.clone(),
                        failure_type: failure_type.clone(),
                    });
                    attempt.verdict = if passed { Verdict::Passed } else { Verdict::Failed };

                    // Resolve the previous attempt's remediation now that
                    // this attempt confirms or refutes it.
                    if let Some(pending) = remediation.take() {
                        self.resolve_remediation(&pending, &scores, attempt_index)
                            .await?;
                    }

                    failure_streak = failure_type.as_ref().map(|ft| match &failure_streak {
                        Some((prev, n)) if prev == ft => (ft.clone(), n + 1),
                        _ => (ft.clone(), 1),
                    });

                    let record =
                        FeedbackRecord::from_attempt(&attempt, &topic_id, &component_kind);

                    if passed {
                        // The in-memory decision is honored even when the
                        // final write fails; the loss is surfaced loudly
                        // so degraded learning does not go unnoticed.
                        if let Err(err) = self.store.append(record).await {
                            error!(
                                %session_id,
                                attempt_index,
                                %err,
                                "accepted content could not be persisted to the feedback store"
                            );
                        }
                        if let Some(fp) = fingerprint {
                            self.diversity.record_accepted(&component_kind, fp);
                        }
                        let evaluation = attempt
                            .evaluation
                            .clone()
                            .unwrap_or(EvaluationResult {
                                dimension_scores: BTreeMap::new(),
                                failure_type: None,
                            });
                        let content = attempt.content.clone().unwrap_or_default();
                        info!(%session_id, attempt_index, "session passed");
                        attempts.push(attempt);
                        return Ok(SessionReport {
                            session_id,
                            outcome: SessionOutcome::Passed {
                                content,
                                evaluation,
                            },
                            attempts,
                        });
                    }

                    self.store.append(record).await?;
                    let failing = failure_type.unwrap_or_default();
                    debug!(%session_id, attempt_index, failure_type = %failing, "attempt failed gate");
                    let failing_score = scores.get(&failing).copied().unwrap_or(0.0);
                    attempts.push(attempt);

                    if attempt_index < self.max_attempts {
                        SessionState::Retrying(Some(RetryContext {
                            failure_type: failing,
                            failing_score,
                        }))
                    } else {
                        SessionState::Exhausted
                    }
                }

                SessionState::Retrying(context) => {
                    if shutdown_rx.try_recv().is_ok() {
                        info!(%session_id, attempt_index, "session cancelled between attempts");
                        return Err(SessionError::Cancelled);
                    }

                    if let Some(context) = context {
                        let statistics = self.store.snapshot_statistics().await?;
                        let prior = Self::prior_application(&attempts, &failure_streak);
                        let strategy = self.selector.select(
                            &context.failure_type,
                            attempt_index,
                            prior.as_ref(),
                            &statistics,
                        )?;

                        info!(
                            %session_id,
                            attempt_index,
                            failure_type = %context.failure_type,
                            strategy = %strategy.id,
                            "applying fix strategy"
                        );
                        parameters = strategy.apply(&parameters);
                        applied_strategy = Some(strategy.id.clone());
                        remediation = Some(PendingRemediation {
                            strategy_id: strategy.id.clone(),
                            failure_type: context.failure_type,
                            prior_score: context.failing_score,
                        });
                    }

                    attempt_index += 1;
                    SessionState::Generating
                }

                SessionState::Exhausted => {
                    let best_attempt_index = Self::best_attempt_index(&attempts);
                    info!(
                        %session_id,
                        attempts = attempts.len(),
                        ?best_attempt_index,
                        "session exhausted without passing"
                    );
                    return Ok(SessionReport {
                        session_id,
                        outcome: SessionOutcome::Exhausted { best_attempt_index },
                        attempts,
                    });
                }
            };
        }
    }

    /// Mark an attempt as a generation failure. A remediation pending on
    /// this attempt stays unresolved: with no scores there is nothing to
    /// confirm or refute, so no statistics are recorded.
    fn fail_generation(&self, attempt: &mut Attempt, remediation: &mut Option<PendingRemediation>) {
        attempt.verdict = Verdict::GenerationError;
        if remediation.take().is_some() {
            debug!(
                attempt_index = attempt.attempt_index,
                "remediation unresolved: generation failed before evaluation"
            );
        }
    }

    /// Record whether an applied strategy cleared the gate it targeted.
    async fn resolve_remediation(
        &self,
        pending: &PendingRemediation,
        scores: &BTreeMap<String, f64>,
        attempt_index: u32,
    ) -> SessionResult<()> {
        // The targeted dimension may be unscored when it is the diversity
        // gate and this candidate failed outright; skip rather than guess.
        let Some(new_score) = scores.get(&pending.failure_type).copied() else {
            return Ok(());
        };

        let threshold = self
            .policy
            .threshold_for(&pending.failure_type, attempt_index)?;
        let success = new_score >= threshold;
        let improvement = new_score - pending.prior_score;

        debug!(
            strategy = %pending.strategy_id,
            failure_type = %pending.failure_type,
            success,
            improvement,
            "recording remediation outcome"
        );
        self.store
            .increment_statistics(
                &pending.strategy_id,
                &pending.failure_type,
                success,
                improvement,
            )
            .await?;
        Ok(())
    }

    fn prior_application(
        attempts: &[Attempt],
        failure_streak: &Option<(String, u32)>,
    ) -> Option<PriorApplication> {
        let last = attempts.last()?;
        let strategy_id = last.strategy_applied.clone()?;
        let (failure_type, consecutive_failures) = failure_streak.clone()?;
        Some(PriorApplication {
            strategy_id,
            failure_type,
            consecutive_failures,
        })
    }

    /// Best exhausted attempt: ranked by the score of each attempt's own
    /// failing dimension, falling back to the mean score. Earlier
    /// attempts win ties.
    fn best_attempt_index(attempts: &[Attempt]) -> Option<u32> {
        let mut best: Option<(u32, f64)> = None;
        for attempt in attempts {
            let Some(eval) = &attempt.evaluation else {
                continue;
            };
            let score = attempt.failure_dimension_score().unwrap_or_else(|| {
                if eval.dimension_scores.is_empty() {
                    0.0
                } else {
                    eval.dimension_scores.values().sum::<f64>()
                        / eval.dimension_scores.len() as f64
                }
            });
            let better = match best {
                None => true,
                Some((_, best_score)) => score > best_score,
            };
            if better {
                best = Some((attempt.attempt_index, score));
            }
        }
        best.map(|(index, _)| index)
            .or_else(|| attempts.first().map(|a| a.attempt_index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::GeneratorError;
    use crate::domain::models::ParamValue;
    use crate::domain::ports::InMemoryFeedbackStore;
    use std::sync::Mutex;

    /// Generator that replays a scripted sequence of results.
    struct ScriptedGenerator {
        script: Mutex<Vec<Result<String, GeneratorError>>>,
    }

    impl ScriptedGenerator {
        fn new(script: Vec<Result<String, GeneratorError>>) -> Self {
            Self {
                script: Mutex::new(script),
            }
        }
    }

    #[async_trait::async_trait]
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

    /// Scorer replaying one score per call, repeating the last.
    struct SequenceScorer {
        name: String,
        values: Mutex<Vec<f64>>,
    }

    impl SequenceScorer {
        fn boxed(name: &str, values: &[f64]) -> Box<dyn DimensionScorer> {
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

        fn score(&self, _text: &str) -> Result<f64, crate::domain::errors::EvaluationError> {
            let mut values = self.values.lock().unwrap();
            if values.len() > 1 {
                Ok(values.remove(0))
            } else {
                Ok(values.first().copied().unwrap_or(0.0))
            }
        }
    }

    fn request() -> SessionRequest {
        SessionRequest {
            prompt: PromptContext::new("topic-1", "bio", "write a short bio"),
            initial_parameters: GenerationParams::new()
                .with("temperature", ParamValue::Number(0.7)),
        }
    }

    fn engine_with(
        script: Vec<Result<String, GeneratorError>>,
        scorers: Vec<Box<dyn DimensionScorer>>,
    ) -> (GenerationEngine, Arc<InMemoryFeedbackStore>) {
        let store = Arc::new(InMemoryFeedbackStore::new());
        let engine = GenerationEngine::new(
            &Config::default(),
            Arc::new(ScriptedGenerator::new(script)),
            scorers,
            Arc::clone(&store) as Arc<dyn FeedbackStore>,
        );
        (engine, store)
    }

    fn passing_scorers() -> Vec<Box<dyn DimensionScorer>> {
        vec![
            SequenceScorer::boxed("ai_detection", &[8.0]),
            SequenceScorer::boxed("realism", &[8.0]),
            SequenceScorer::boxed("voice_authenticity", &[8.0]),
            SequenceScorer::boxed("tonal_consistency", &[8.0]),
        ]
    }

    #[tokio::test]
    async fn test_first_attempt_pass() {
        let (engine, store) = engine_with(
            vec![Ok("A perfectly fine bio about someone real.".to_string())],
            passing_scorers(),
        );

        let report = engine.run_session(request()).await.unwrap();
        assert!(report.passed());
        assert_eq!(report.attempts.len(), 1);
        assert_eq!(report.attempts[0].verdict, Verdict::Passed);
        assert!(report.attempts[0].strategy_applied.is_none());
        assert_eq!(store.record_count(), 1);
        assert_eq!(engine.diversity_tracker().window_len("bio"), 1);
    }

    #[tokio::test]
    async fn test_generation_error_consumes_attempt_then_recovers() {
        let (engine, store) = engine_with(
            vec![
                Err(GeneratorError::Backend("boom".to_string())),
                Ok("Recovered content, plenty human.".to_string()),
            ],
            passing_scorers(),
        );

        let report = engine.run_session(request()).await.unwrap();
        assert!(report.passed());
        assert_eq!(report.attempts.len(), 2);
        assert_eq!(report.attempts[0].verdict, Verdict::GenerationError);
        assert!(report.attempts[0].evaluation.is_none());
        assert_eq!(report.attempts[1].attempt_index, 2);
        // the failed generation carried no strategy
        assert!(report.attempts[1].strategy_applied.is_none());
        assert_eq!(store.record_count(), 2);
    }

    #[tokio::test]
    async fn test_failed_attempt_applies_strategy_and_retries() {
        let (engine, store) = engine_with(
            vec![
                Ok("Robotic text.".to_string()),
                Ok("Much warmer text now.".to_string()),
            ],
            vec![
                // fails attempt 1 (threshold 4.0), clears attempt 2
                SequenceScorer::boxed("ai_detection", &[2.0, 8.0]),
                SequenceScorer::boxed("realism", &[8.0]),
                SequenceScorer::boxed("voice_authenticity", &[8.0]),
                SequenceScorer::boxed("tonal_consistency", &[8.0]),
            ],
        );

        let report = engine.run_session(request()).await.unwrap();
        assert!(report.passed());
        assert_eq!(report.attempts.len(), 2);
        assert_eq!(report.attempts[0].verdict, Verdict::Failed);
        assert_eq!(
            report.attempts[0]
                .evaluation
                .as_ref()
                .unwrap()
                .failure_type
                .as_deref(),
            Some("ai_detection")
        );
        // default strategy for ai_detection below the exploration floor
        assert_eq!(
            report.attempts[1].strategy_applied.as_deref(),
            Some("humanize_phrasing")
        );
        // temperature nudged up by the strategy's delta
        assert!(
            report.attempts[1].parameters.number("temperature").unwrap()
                > report.attempts[0].parameters.number("temperature").unwrap()
        );

        // the remediation outcome fed the statistics
        let stats = store.snapshot_statistics().await.unwrap();
        let bucket = stats
            .get(&crate::domain::models::StatKey::new(
                "humanize_phrasing",
                "ai_detection",
            ))
            .unwrap();
        assert_eq!(bucket.attempts_count, 1);
        assert_eq!(bucket.successes_count, 1);
        assert!((bucket.sum_score_improvement - 6.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_attempt_bound_never_exceeded() {
        let script: Vec<_> = (0..10).map(|i| Ok(format!("attempt {i}"))).collect();
        let (engine, _store) = engine_with(
            script,
            vec![
                SequenceScorer::boxed("ai_detection", &[8.0]),
                SequenceScorer::boxed("realism", &[1.0]), // never passes
                SequenceScorer::boxed("voice_authenticity", &[8.0]),
                SequenceScorer::boxed("tonal_consistency", &[8.0]),
            ],
        );

        let report = engine.run_session(request()).await.unwrap();
        assert!(!report.passed());
        assert_eq!(report.attempts.len(), Config::default().max_attempts as usize);
    }

    #[tokio::test]
    async fn test_scenario_b_exhausted_reports_best_realism_attempt() {
        let config = Config {
            max_attempts: 3,
            ..Config::default()
        };
        let store = Arc::new(InMemoryFeedbackStore::new());
        let engine = GenerationEngine::new(
            &config,
            Arc::new(ScriptedGenerator::new(vec![
                Ok("first".to_string()),
                Ok("second".to_string()),
                Ok("third".to_string()),
            ])),
            vec![
                SequenceScorer::boxed("ai_detection", &[8.0]),
                // all three fail realism; the second scores highest
                SequenceScorer::boxed("realism", &[2.0, 4.5, 3.0]),
                SequenceScorer::boxed("voice_authenticity", &[8.0]),
                SequenceScorer::boxed("tonal_consistency", &[8.0]),
            ],
            Arc::clone(&store) as Arc<dyn FeedbackStore>,
        );

        let report = engine.run_session(request()).await.unwrap();
        assert!(!report.passed());
        assert_eq!(report.attempts.len(), 3);
        match report.outcome {
            SessionOutcome::Exhausted { best_attempt_index } => {
                assert_eq!(best_attempt_index, Some(2));
            }
            SessionOutcome::Passed { .. } => panic!("session should have exhausted"),
        }
        // no fingerprint recorded for a failed session
        assert_eq!(engine.diversity_tracker().window_len("bio"), 0);
    }

    #[tokio::test]
    async fn test_cancelled_session_persists_nothing_partial() {
        let (engine, store) = engine_with(
            vec![Ok("never read".to_string())],
            passing_scorers(),
        );
        engine.shutdown();

        let result = engine.run_session(request()).await;
        assert!(matches!(result, Err(SessionError::Cancelled)));
        assert_eq!(store.record_count(), 0);
    }
}
