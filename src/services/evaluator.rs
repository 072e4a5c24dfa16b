//! Evaluator aggregator.
//!
//! Runs every registered scorer once against a candidate and bundles the
//! per-dimension scores. Scorers are pure, so ordering is irrelevant; a
//! scorer failure aborts the whole evaluation rather than substituting a
//! default; a missing dimension must never look like a passing one.

use std::collections::BTreeMap;

use crate::domain::errors::EvaluationError;
use crate::domain::ports::DimensionScorer;

/// Aggregates the configured scoring functions for one evaluation pass.
pub struct Evaluator {
    scorers: Vec<Box<dyn DimensionScorer>>,
}

impl Evaluator {
    pub fn new(scorers: Vec<Box<dyn DimensionScorer>>) -> Self {
        Self { scorers }
    }

    /// Names of the registered dimensions.
    pub fn dimensions(&self) -> impl Iterator<Item = &str> {
        self.scorers.iter().map(|s| s.name())
    }

    /// Score the candidate along every registered dimension.
    ///
    /// No retries happen at this layer; retry policy belongs to the
    /// session orchestrator.
    pub fn evaluate(&self, text: &str) -> Result<BTreeMap<String, f64>, EvaluationError> {
        let mut scores = BTreeMap::new();

        for scorer in &self.scorers {
            let value = scorer.score(text)?;
            if !(0.0..=10.0).contains(&value) {
                return Err(EvaluationError::ScoreOutOfRange {
                    dimension: scorer.name().to_string(),
                    value,
                });
            }
            scores.insert(scorer.name().to_string(), value);
        }

        Ok(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedScorer {
        name: String,
        value: f64,
    }

    impl DimensionScorer for FixedScorer {
        fn name(&self) -> &str {
            &self.name
        }

        fn score(&self, _text: &str) -> Result<f64, EvaluationError> {
            Ok(self.value)
        }
    }

    struct FailingScorer;

    impl DimensionScorer for FailingScorer {
        fn name(&self) -> &str {
            "realism"
        }

        fn score(&self, _text: &str) -> Result<f64, EvaluationError> {
            Err(EvaluationError::ScorerFailed {
                dimension: "realism".to_string(),
                reason: "lexicon unavailable".to_string(),
            })
        }
    }

    fn fixed(name: &str, value: f64) -> Box<dyn DimensionScorer> {
        Box::new(FixedScorer {
            name: name.to_string(),
            value,
        })
    }

    #[test]
    fn test_every_dimension_scored_once() {
        let evaluator = Evaluator::new(vec![
            fixed("ai_detection", 7.0),
            fixed("realism", 6.0),
            fixed("voice_authenticity", 8.5),
        ]);

        let scores = evaluator.evaluate("candidate text").unwrap();
        assert_eq!(scores.len(), 3);
        assert_eq!(scores.get("realism"), Some(&6.0));
    }

    #[test]
    fn test_scorer_failure_aborts_evaluation() {
        let evaluator = Evaluator::new(vec![fixed("ai_detection", 7.0), Box::new(FailingScorer)]);

        let err = evaluator.evaluate("candidate text").unwrap_err();
        assert!(matches!(err, EvaluationError::ScorerFailed { .. }));
    }

    #[test]
    fn test_out_of_range_score_rejected() {
        let evaluator = Evaluator::new(vec![fixed("realism", 11.0)]);
        let err = evaluator.evaluate("candidate text").unwrap_err();
        assert!(matches!(
            err,
            EvaluationError::ScoreOutOfRange { value, .. } if (value - 11.0).abs() < 1e-9
        ));
    }
}
