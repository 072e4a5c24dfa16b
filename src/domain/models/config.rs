//! Engine configuration.
//!
//! Everything the core consumes is declared here: the attempt budget,
//! per-dimension threshold schedules, the fix-strategy catalog with its
//! per-failure-type defaults, diversity scoring knobs, and the ambient
//! database/logging settings.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::attempt::ParamValue;
use super::strategy::{DeltaOp, FixStrategy, ParameterDelta};
use super::threshold::ThresholdSchedule;

/// Main configuration structure for Quillgate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Maximum generation attempts per session (>= 1).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Per-attempt generator timeout in milliseconds. A timed-out call is
    /// treated identically to a generation error and consumes an attempt.
    #[serde(default = "default_attempt_timeout_ms")]
    pub attempt_timeout_ms: u64,

    /// Attempt index below which the selector always returns the default
    /// strategy instead of ranking by learned statistics.
    #[serde(default = "default_exploration_floor")]
    pub exploration_floor: u32,

    /// Minimum `attempts_count` a statistics bucket needs before the
    /// selector trusts it for ranking.
    #[serde(default = "default_minimum_sample_size")]
    pub minimum_sample_size: u64,

    /// Fixed dimension order used to break ties when several dimensions
    /// fail with the same margin. Earlier entries win.
    #[serde(default = "default_dimension_priority")]
    pub dimension_priority: Vec<String>,

    /// Threshold schedule per dimension.
    #[serde(default = "default_thresholds")]
    pub thresholds: BTreeMap<String, ThresholdSchedule>,

    /// Diversity scoring configuration.
    #[serde(default)]
    pub diversity: DiversityConfig,

    /// Fix-strategy catalog.
    #[serde(default = "default_strategies")]
    pub strategies: Vec<FixStrategy>,

    /// Declared default strategy per failure type, used below the
    /// exploration floor and as the deterministic fallback.
    #[serde(default = "default_strategy_defaults")]
    pub default_strategies: BTreeMap<String, String>,

    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            attempt_timeout_ms: default_attempt_timeout_ms(),
            exploration_floor: default_exploration_floor(),
            minimum_sample_size: default_minimum_sample_size(),
            dimension_priority: default_dimension_priority(),
            thresholds: default_thresholds(),
            diversity: DiversityConfig::default(),
            strategies: default_strategies(),
            default_strategies: default_strategy_defaults(),
            database: DatabaseConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

const fn default_max_attempts() -> u32 {
    5
}

const fn default_attempt_timeout_ms() -> u64 {
    60_000
}

const fn default_exploration_floor() -> u32 {
    2
}

const fn default_minimum_sample_size() -> u64 {
    5
}

fn default_dimension_priority() -> Vec<String> {
    vec![
        "ai_detection".to_string(),
        "realism".to_string(),
        "voice_authenticity".to_string(),
        "tonal_consistency".to_string(),
        "structural_diversity".to_string(),
    ]
}

fn default_thresholds() -> BTreeMap<String, ThresholdSchedule> {
    BTreeMap::from([
        (
            "ai_detection".to_string(),
            ThresholdSchedule::from_pairs(&[(3, 4.0), (6, 6.5), (99, 7.0)]),
        ),
        (
            "realism".to_string(),
            ThresholdSchedule::from_pairs(&[(3, 5.0), (99, 6.0)]),
        ),
        (
            "voice_authenticity".to_string(),
            ThresholdSchedule::from_pairs(&[(3, 5.0), (99, 6.0)]),
        ),
        (
            "tonal_consistency".to_string(),
            ThresholdSchedule::from_pairs(&[(3, 4.5), (99, 5.5)]),
        ),
        (
            "structural_diversity".to_string(),
            ThresholdSchedule::from_pairs(&[(3, 4.0), (99, 5.0)]),
        ),
    ])
}

fn delta(parameter: &str, op: DeltaOp, min: Option<f64>, max: Option<f64>) -> ParameterDelta {
    ParameterDelta {
        parameter: parameter.to_string(),
        op,
        min,
        max,
    }
}

fn strategy(id: &str, name: &str, failure_types: &[&str], deltas: Vec<ParameterDelta>) -> FixStrategy {
    FixStrategy {
        id: id.to_string(),
        name: name.to_string(),
        applicable_failure_types: failure_types
            .iter()
            .map(|s| (*s).to_string())
            .collect::<BTreeSet<_>>(),
        deltas,
    }
}

fn default_strategies() -> Vec<FixStrategy> {
    vec![
        strategy(
            "humanize_phrasing",
            "Loosen phrasing to read less machine-generated",
            &["ai_detection"],
            vec![
                delta("temperature", DeltaOp::Add(0.15), None, Some(1.3)),
                delta("repetition_penalty", DeltaOp::Add(0.1), None, Some(1.5)),
            ],
        ),
        strategy(
            "loosen_register",
            "Push register toward informal speech",
            &["ai_detection", "tonal_consistency"],
            vec![
                delta("temperature", DeltaOp::Add(0.05), None, Some(1.3)),
                delta("voice_intensity", DeltaOp::Add(0.1), None, Some(1.0)),
            ],
        ),
        strategy(
            "ground_specifics",
            "Demand more concrete, checkable detail",
            &["realism"],
            vec![
                delta("detail_level", DeltaOp::Add(1.0), None, Some(5.0)),
                delta("temperature", DeltaOp::Add(-0.05), Some(0.2), None),
            ],
        ),
        strategy(
            "restrain_sampling",
            "Cool sampling to reduce drift",
            &["realism", "tonal_consistency"],
            vec![delta("temperature", DeltaOp::Scale(0.85), Some(0.2), None)],
        ),
        strategy(
            "amplify_voice",
            "Strengthen the persona voice knobs",
            &["voice_authenticity"],
            vec![delta("voice_intensity", DeltaOp::Add(0.2), None, Some(1.0))],
        ),
        strategy(
            "steady_tone",
            "Lower temperature to steady the tone",
            &["tonal_consistency"],
            vec![delta("temperature", DeltaOp::Add(-0.1), Some(0.2), None)],
        ),
        strategy(
            "vary_structure",
            "Shake up structure and openings",
            &["structural_diversity"],
            vec![
                delta("temperature", DeltaOp::Add(0.2), None, Some(1.3)),
                delta("structure_variation", DeltaOp::Add(1.0), None, Some(5.0)),
            ],
        ),
        strategy(
            "reseed_opening",
            "Rotate the opening style",
            &["structural_diversity", "voice_authenticity"],
            vec![
                delta(
                    "opening_style",
                    DeltaOp::Set(ParamValue::Choice("rotate".to_string())),
                    None,
                    None,
                ),
                delta("temperature", DeltaOp::Add(0.1), None, Some(1.3)),
            ],
        ),
    ]
}

fn default_strategy_defaults() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("ai_detection".to_string(), "humanize_phrasing".to_string()),
        ("realism".to_string(), "ground_specifics".to_string()),
        ("voice_authenticity".to_string(), "amplify_voice".to_string()),
        ("tonal_consistency".to_string(), "steady_tone".to_string()),
        ("structural_diversity".to_string(), "vary_structure".to_string()),
    ])
}

/// A named pattern with the needles that detect it in candidate text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PatternRule {
    pub tag: String,
    /// Lowercase substrings; matching is case-insensitive.
    pub needles: Vec<String>,
}

impl PatternRule {
    pub fn new(tag: &str, needles: &[&str]) -> Self {
        Self {
            tag: tag.to_string(),
            needles: needles.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

/// Diversity scoring configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DiversityConfig {
    /// Rolling window capacity per component kind.
    #[serde(default = "default_window_capacity")]
    pub window_capacity: usize,

    /// How many of the newest window entries repetition checks look at.
    #[serde(default = "default_recent_k")]
    pub recent_k: usize,

    /// Word-count band around the recent mean (percent) that counts as
    /// repetitive length.
    #[serde(default = "default_mean_band_pct")]
    pub mean_band_pct: f64,

    /// Penalty when the opening tag matches >= 2 recent entries.
    #[serde(default = "default_opening_penalty")]
    pub opening_penalty: f64,

    /// Penalty when the word count sits inside the mean band.
    #[serde(default = "default_length_penalty")]
    pub length_penalty: f64,

    /// Penalty when the formulaic-shape predicate matches.
    #[serde(default = "default_formulaic_penalty")]
    pub formulaic_penalty: f64,

    /// Penalty per repeated linguistic-pattern tag.
    #[serde(default = "default_pattern_penalty")]
    pub pattern_penalty: f64,

    /// Cap on the summed per-tag penalties.
    #[serde(default = "default_pattern_penalty_cap")]
    pub pattern_penalty_cap: f64,

    /// Opening-pattern classification rules; first match wins.
    #[serde(default = "default_opening_patterns")]
    pub opening_patterns: Vec<PatternRule>,

    /// Linguistic-pattern detection rules.
    #[serde(default = "default_linguistic_patterns")]
    pub linguistic_patterns: Vec<PatternRule>,

    /// Content-block markers used to build a shape signature.
    #[serde(default = "default_shape_markers")]
    pub shape_markers: Vec<PatternRule>,

    /// The block ordering considered formulaic.
    #[serde(default = "default_formulaic_shape")]
    pub formulaic_shape: Vec<String>,
}

impl Default for DiversityConfig {
    fn default() -> Self {
        Self {
            window_capacity: default_window_capacity(),
            recent_k: default_recent_k(),
            mean_band_pct: default_mean_band_pct(),
            opening_penalty: default_opening_penalty(),
            length_penalty: default_length_penalty(),
            formulaic_penalty: default_formulaic_penalty(),
            pattern_penalty: default_pattern_penalty(),
            pattern_penalty_cap: default_pattern_penalty_cap(),
            opening_patterns: default_opening_patterns(),
            linguistic_patterns: default_linguistic_patterns(),
            shape_markers: default_shape_markers(),
            formulaic_shape: default_formulaic_shape(),
        }
    }
}

const fn default_window_capacity() -> usize {
    20
}

const fn default_recent_k() -> usize {
    10
}

const fn default_mean_band_pct() -> f64 {
    5.0
}

const fn default_opening_penalty() -> f64 {
    3.0
}

const fn default_length_penalty() -> f64 {
    1.5
}

const fn default_formulaic_penalty() -> f64 {
    2.0
}

const fn default_pattern_penalty() -> f64 {
    0.5
}

const fn default_pattern_penalty_cap() -> f64 {
    2.0
}

fn default_opening_patterns() -> Vec<PatternRule> {
    vec![
        PatternRule::new("direct_address", &["you ", "your "]),
        PatternRule::new("question", &["why ", "what ", "how ", "ever "]),
        PatternRule::new("first_person", &["i ", "i'", "we ", "my "]),
        PatternRule::new("scene_setting", &["the ", "it was", "on a", "in a"]),
    ]
}

fn default_linguistic_patterns() -> Vec<PatternRule> {
    vec![
        PatternRule::new("rhetorical_question", &["?"]),
        PatternRule::new("hedging", &["perhaps", "maybe", "might ", "arguably"]),
        PatternRule::new("superlative", &["best ", "most ", "every ", "always "]),
        PatternRule::new("contrast_pivot", &["but ", "however", "that said"]),
        PatternRule::new("list_markers", &["first", "second", "finally"]),
    ]
}

fn default_shape_markers() -> Vec<PatternRule> {
    vec![
        PatternRule::new("greeting", &["hi ", "hello", "hey "]),
        PatternRule::new("pitch", &["introducing", "we offer", "i offer", "i specialize"]),
        PatternRule::new("call_to_action", &["contact", "reach out", "dm me", "let's talk"]),
    ]
}

fn default_formulaic_shape() -> Vec<String> {
    vec![
        "greeting".to_string(),
        "pitch".to_string(),
        "call_to_action".to_string(),
    ]
}

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// Path to the `SQLite` database file.
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Maximum number of database connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> String {
    ".quillgate/quillgate.db".to_string()
}

const fn default_max_connections() -> u32 {
    10
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stdout only when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_internally_consistent() {
        let config = Config::default();

        // every prioritized dimension has a schedule
        for dim in &config.dimension_priority {
            assert!(
                config.thresholds.contains_key(dim),
                "missing schedule for {dim}"
            );
        }

        // every default strategy exists and applies to its failure type
        for (failure_type, strategy_id) in &config.default_strategies {
            let strategy = config
                .strategies
                .iter()
                .find(|s| &s.id == strategy_id)
                .unwrap_or_else(|| panic!("unknown default strategy {strategy_id}"));
            assert!(strategy.applies_to(failure_type));
        }

        // every applicable failure type has a declared default
        for strategy in &config.strategies {
            for failure_type in &strategy.applicable_failure_types {
                assert!(
                    config.default_strategies.contains_key(failure_type),
                    "no default for failure type {failure_type}"
                );
            }
        }
    }

    #[test]
    fn test_default_schedules_are_well_formed() {
        let config = Config::default();
        for (dim, schedule) in &config.thresholds {
            assert!(schedule.is_well_formed(), "malformed schedule for {dim}");
        }
    }

    #[test]
    fn test_strategy_ids_are_unique() {
        let config = Config::default();
        let mut ids: Vec<&str> = config.strategies.iter().map(|s| s.id.as_str()).collect();
        ids.sort_unstable();
        let before = ids.len();
        ids.dedup();
        assert_eq!(before, ids.len());
    }

    #[test]
    fn test_config_yaml_round_trip() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.max_attempts, config.max_attempts);
        assert_eq!(parsed.thresholds, config.thresholds);
        assert_eq!(parsed.strategies, config.strategies);
    }
}
