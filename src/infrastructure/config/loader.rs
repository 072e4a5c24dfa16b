use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid max_attempts: {0}. Must be between 1 and 50")]
    InvalidMaxAttempts(u32),

    #[error("Invalid attempt_timeout_ms: {0}. Must be positive")]
    InvalidAttemptTimeout(u64),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Dimension '{0}' has no threshold schedule")]
    MissingThresholdSchedule(String),

    #[error("Threshold schedule for '{0}' is malformed: bounds must be strictly increasing")]
    MalformedThresholdSchedule(String),

    #[error("Threshold {1} for dimension '{0}' is outside [0, 10]")]
    ThresholdOutOfRange(String, f64),

    #[error("Default strategy '{1}' for failure type '{0}' does not exist or does not apply")]
    InvalidDefaultStrategy(String, String),

    #[error("Failure type '{0}' has applicable strategies but no declared default")]
    MissingDefaultStrategy(String),

    #[error("Duplicate strategy id '{0}'")]
    DuplicateStrategyId(String),

    #[error("Invalid diversity window capacity: {0}. Must be at least 1")]
    InvalidWindowCapacity(usize),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .quillgate/config.yaml (project config, created by init)
    /// 3. .quillgate/local.yaml (project local overrides, optional)
    /// 4. Environment variables (`QUILLGATE_*` prefix, highest priority)
    ///
    /// Configuration is always project-local (pwd/.quillgate/) so several
    /// pipelines can run on one machine with different settings.
    ///
    /// # Errors
    /// Returns an error when extraction or validation fails.
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".quillgate/config.yaml"))
            .merge(Yaml::file(".quillgate/local.yaml"))
            .merge(Env::prefixed("QUILLGATE_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    ///
    /// # Errors
    /// Returns an error when the file cannot be parsed or validation fails.
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    ///
    /// # Errors
    /// Returns the first violated constraint.
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.max_attempts == 0 || config.max_attempts > 50 {
            return Err(ConfigError::InvalidMaxAttempts(config.max_attempts));
        }

        if config.attempt_timeout_ms == 0 {
            return Err(ConfigError::InvalidAttemptTimeout(config.attempt_timeout_ms));
        }

        if config.database.path.is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }

        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(
                config.database.max_connections,
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        if config.diversity.window_capacity == 0 {
            return Err(ConfigError::InvalidWindowCapacity(
                config.diversity.window_capacity,
            ));
        }

        // every prioritized dimension needs a well-formed schedule in range
        for dimension in &config.dimension_priority {
            let Some(schedule) = config.thresholds.get(dimension) else {
                return Err(ConfigError::MissingThresholdSchedule(dimension.clone()));
            };
            if !schedule.is_well_formed() {
                return Err(ConfigError::MalformedThresholdSchedule(dimension.clone()));
            }
            for step in schedule.steps() {
                if !(0.0..=10.0).contains(&step.threshold) {
                    return Err(ConfigError::ThresholdOutOfRange(
                        dimension.clone(),
                        step.threshold,
                    ));
                }
            }
        }

        let mut seen = std::collections::BTreeSet::new();
        for strategy in &config.strategies {
            if !seen.insert(strategy.id.as_str()) {
                return Err(ConfigError::DuplicateStrategyId(strategy.id.clone()));
            }
        }

        // defaults must exist and apply to their failure type
        for (failure_type, strategy_id) in &config.default_strategies {
            let applies = config
                .strategies
                .iter()
                .any(|s| &s.id == strategy_id && s.applies_to(failure_type));
            if !applies {
                return Err(ConfigError::InvalidDefaultStrategy(
                    failure_type.clone(),
                    strategy_id.clone(),
                ));
            }
        }

        // any remediable failure type needs a declared default so selection
        // always has a deterministic fallback
        for strategy in &config.strategies {
            for failure_type in &strategy.applicable_failure_types {
                if !config.default_strategies.contains_key(failure_type) {
                    return Err(ConfigError::MissingDefaultStrategy(failure_type.clone()));
                }
            }
        }

        Ok(())
    }
}
