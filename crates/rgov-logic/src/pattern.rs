//! # Bounded Pattern Matching
//!
//! REGEX_MATCH patterns come from policy authors, so every match runs under
//! two limits: a compiled-program size limit enforced by the regex builder,
//! and a wall-clock budget covering compilation plus matching. The `regex`
//! engine is linear in input length, so the budget is checked between the
//! two phases rather than by interrupting the matcher.

use std::time::{Duration, Instant};

use regex::RegexBuilder;

use crate::error::EvaluationError;

/// Default wall-clock budget for one pattern match.
pub const DEFAULT_REGEX_BUDGET: Duration = Duration::from_millis(50);

/// Default compiled-program size limit (1 MiB).
pub const DEFAULT_REGEX_SIZE_LIMIT: usize = 1 << 20;

/// Limits applied to every REGEX_MATCH leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternLimits {
    /// Wall-clock budget for compile plus match.
    pub budget: Duration,
    /// Maximum compiled program size in bytes.
    pub size_limit: usize,
}

impl Default for PatternLimits {
    fn default() -> Self {
        Self {
            budget: DEFAULT_REGEX_BUDGET,
            size_limit: DEFAULT_REGEX_SIZE_LIMIT,
        }
    }
}

impl PatternLimits {
    /// Limits with the given budget and the default size limit.
    pub fn with_budget(budget: Duration) -> Self {
        Self {
            budget,
            ..Self::default()
        }
    }
}

/// Check that `pattern` compiles within the size limit.
///
/// Used at validation time; does not apply the time budget.
pub fn check_pattern(pattern: &str, size_limit: usize) -> Result<(), EvaluationError> {
    compile(pattern, size_limit).map(|_| ())
}

/// Run `pattern` against `haystack` under `limits`.
pub fn match_with_budget(
    pattern: &str,
    haystack: &str,
    limits: &PatternLimits,
) -> Result<bool, EvaluationError> {
    let deadline = Instant::now() + limits.budget;
    let timeout = || EvaluationError::RegexTimeout {
        pattern: pattern.to_string(),
        budget_ms: limits.budget.as_millis(),
    };

    let re = compile(pattern, limits.size_limit)?;
    if Instant::now() >= deadline {
        return Err(timeout());
    }

    let matched = re.is_match(haystack);
    if Instant::now() >= deadline {
        tracing::warn!(
            pattern,
            budget_ms = %limits.budget.as_millis(),
            "regex match exceeded budget"
        );
        return Err(timeout());
    }
    Ok(matched)
}

fn compile(pattern: &str, size_limit: usize) -> Result<regex::Regex, EvaluationError> {
    RegexBuilder::new(pattern)
        .size_limit(size_limit)
        .dfa_size_limit(size_limit)
        .build()
        .map_err(|e| match e {
            regex::Error::CompiledTooBig(_) => EvaluationError::PatternTooComplex {
                pattern: pattern.to_string(),
                size_limit,
            },
            other => EvaluationError::InvalidPattern {
                pattern: pattern.to_string(),
                message: other.to_string(),
            },
        })
}
