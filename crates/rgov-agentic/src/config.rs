//! # Engine Configuration
//!
//! Limits shared by validation, evaluation and bulk orchestration.
//!
//! | Field | Default | Environment |
//! |---|---|---|
//! | `regex_budget_ms` | 50 | `RGOV_REGEX_BUDGET_MS` |
//! | `regex_size_limit` | 1 MiB | `RGOV_REGEX_SIZE_LIMIT` |
//! | `max_workers` | 16 | `RGOV_MAX_WORKERS` |
//! | `max_condition_depth` | 32 | `RGOV_MAX_CONDITION_DEPTH` |
//!
//! All values must be non-zero.

use std::str::FromStr;
use std::time::Duration;

use rgov_logic::pattern::{DEFAULT_REGEX_BUDGET, DEFAULT_REGEX_SIZE_LIMIT};
use rgov_logic::{EvaluatorOptions, PatternLimits, ValidationOptions, DEFAULT_MAX_DEPTH};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ENV_REGEX_BUDGET_MS: &str = "RGOV_REGEX_BUDGET_MS";
pub const ENV_REGEX_SIZE_LIMIT: &str = "RGOV_REGEX_SIZE_LIMIT";
pub const ENV_MAX_WORKERS: &str = "RGOV_MAX_WORKERS";
pub const ENV_MAX_CONDITION_DEPTH: &str = "RGOV_MAX_CONDITION_DEPTH";

/// Default bulk worker pool size.
pub const DEFAULT_MAX_WORKERS: usize = 16;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable did not parse.
    #[error("{var}={value:?} is not a valid unsigned integer")]
    InvalidEnv { var: &'static str, value: String },

    /// A value is outside its allowed range.
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
}

/// Engine limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Wall-clock budget per REGEX_MATCH, in milliseconds.
    pub regex_budget_ms: u64,
    /// Compiled size limit for REGEX_MATCH patterns, in bytes.
    pub regex_size_limit: usize,
    /// Upper bound on concurrent bulk workers.
    pub max_workers: usize,
    /// Deepest allowed condition tree.
    pub max_condition_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            regex_budget_ms: DEFAULT_REGEX_BUDGET.as_millis() as u64,
            regex_size_limit: DEFAULT_REGEX_SIZE_LIMIT,
            max_workers: DEFAULT_MAX_WORKERS,
            max_condition_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by any `RGOV_*` variables that are set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_overrides(|var| std::env::var(var).ok())
    }

    /// Apply overrides from `lookup`, then validate.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        override_from(&lookup, ENV_REGEX_BUDGET_MS, &mut self.regex_budget_ms)?;
        override_from(&lookup, ENV_REGEX_SIZE_LIMIT, &mut self.regex_size_limit)?;
        override_from(&lookup, ENV_MAX_WORKERS, &mut self.max_workers)?;
        override_from(&lookup, ENV_MAX_CONDITION_DEPTH, &mut self.max_condition_depth)?;
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks: [(&'static str, bool); 4] = [
            ("regex_budget_ms", self.regex_budget_ms == 0),
            ("regex_size_limit", self.regex_size_limit == 0),
            ("max_workers", self.max_workers == 0),
            ("max_condition_depth", self.max_condition_depth == 0),
        ];
        for (field, zero) in checks {
            if zero {
                return Err(ConfigError::Zero { field });
            }
        }
        Ok(())
    }

    pub fn pattern_limits(&self) -> PatternLimits {
        PatternLimits {
            budget: Duration::from_millis(self.regex_budget_ms),
            size_limit: self.regex_size_limit,
        }
    }

    pub fn evaluator_options(&self) -> EvaluatorOptions {
        EvaluatorOptions {
            patterns: self.pattern_limits(),
            max_depth: self.max_condition_depth,
        }
    }

    pub fn validation_options(&self) -> ValidationOptions {
        ValidationOptions {
            max_depth: self.max_condition_depth,
            regex_size_limit: self.regex_size_limit,
        }
    }
}

fn override_from<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    slot: &mut T,
) -> Result<(), ConfigError> {
    if let Some(raw) = lookup(var) {
        *slot = raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidEnv { var, value: raw })?;
    }
    Ok(())
}
