//! # Operator Library
//!
//! Every leaf operator is a pure function of `(context value, operand)`.
//! Dispatch goes through [`lookup`], a fixed table; the logical operators
//! have no entry because they only ever appear on composite nodes.
//!
//! ## Coercion rules
//!
//! - Comparison operators coerce both sides to numbers. EQUALS/NOT_EQUALS
//!   fall back to exact text comparison when either side is non-numeric;
//!   the ordering operators raise [`EvaluationError::NotNumeric`] instead.
//! - String operators are case-insensitive over the text form (arrays are
//!   joined with `,`).
//! - Array operators compare case-insensitive string sets.
//! - A missing (null) context value fails every operator except IS_NULL and
//!   IS_NOT_NULL. The evaluator applies that rule before dispatch, so the
//!   functions below never see a null context value for other operators.

use std::collections::BTreeSet;
use std::str::FromStr;

use rgov_core::FieldValue;
use serde::{Deserialize, Serialize};

use crate::error::EvaluationError;
use crate::pattern::{match_with_budget, PatternLimits};

/// Every operator a condition node may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operator {
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    RegexMatch,
    ContainsAny,
    ContainsAll,
    NotContainsAny,
    IsTrue,
    IsFalse,
    IsNull,
    IsNotNull,
    And,
    Or,
    Not,
}

/// Operator families, grouped by the operand types they expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorGroup {
    /// Numeric/equality comparisons.
    Comparison,
    /// Text matching.
    String,
    /// Set membership.
    Array,
    /// Truthiness and nullness; the operand is ignored.
    Boolean,
    /// Composite-only combinators.
    Logical,
}

impl Operator {
    /// All operators in declaration order.
    pub fn all() -> &'static [Operator] {
        use Operator::*;
        &[
            Equals,
            NotEquals,
            GreaterThan,
            LessThan,
            GreaterThanOrEqual,
            LessThanOrEqual,
            Contains,
            NotContains,
            StartsWith,
            EndsWith,
            RegexMatch,
            ContainsAny,
            ContainsAll,
            NotContainsAny,
            IsTrue,
            IsFalse,
            IsNull,
            IsNotNull,
            And,
            Or,
            Not,
        ]
    }

    /// Wire name of the operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equals => "EQUALS",
            Self::NotEquals => "NOT_EQUALS",
            Self::GreaterThan => "GREATER_THAN",
            Self::LessThan => "LESS_THAN",
            Self::GreaterThanOrEqual => "GREATER_THAN_OR_EQUAL",
            Self::LessThanOrEqual => "LESS_THAN_OR_EQUAL",
            Self::Contains => "CONTAINS",
            Self::NotContains => "NOT_CONTAINS",
            Self::StartsWith => "STARTS_WITH",
            Self::EndsWith => "ENDS_WITH",
            Self::RegexMatch => "REGEX_MATCH",
            Self::ContainsAny => "CONTAINS_ANY",
            Self::ContainsAll => "CONTAINS_ALL",
            Self::NotContainsAny => "NOT_CONTAINS_ANY",
            Self::IsTrue => "IS_TRUE",
            Self::IsFalse => "IS_FALSE",
            Self::IsNull => "IS_NULL",
            Self::IsNotNull => "IS_NOT_NULL",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Not => "NOT",
        }
    }

    /// The family this operator belongs to.
    pub fn group(&self) -> OperatorGroup {
        match self {
            Self::Equals
            | Self::NotEquals
            | Self::GreaterThan
            | Self::LessThan
            | Self::GreaterThanOrEqual
            | Self::LessThanOrEqual => OperatorGroup::Comparison,
            Self::Contains
            | Self::NotContains
            | Self::StartsWith
            | Self::EndsWith
            | Self::RegexMatch => OperatorGroup::String,
            Self::ContainsAny | Self::ContainsAll | Self::NotContainsAny => OperatorGroup::Array,
            Self::IsTrue | Self::IsFalse | Self::IsNull | Self::IsNotNull => {
                OperatorGroup::Boolean
            }
            Self::And | Self::Or | Self::Not => OperatorGroup::Logical,
        }
    }

    /// Whether this is a composite-only combinator.
    pub fn is_logical(&self) -> bool {
        self.group() == OperatorGroup::Logical
    }

    /// Whether the operator is defined for a missing context value.
    pub fn defined_for_missing(&self) -> bool {
        matches!(self, Self::IsNull | Self::IsNotNull)
    }

    /// Whether a leaf with this operator needs a non-null operand.
    pub fn requires_operand(&self) -> bool {
        matches!(
            self.group(),
            OperatorGroup::Comparison | OperatorGroup::String | OperatorGroup::Array
        )
    }

    /// Whether the operator only makes sense with numeric operands.
    pub fn is_ordering(&self) -> bool {
        matches!(
            self,
            Self::GreaterThan
                | Self::LessThan
                | Self::GreaterThanOrEqual
                | Self::LessThanOrEqual
        )
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = String;

    /// Parse a wire operator name. Matching is exact: `equals` is unknown.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| format!("unknown operator {s:?}"))
    }
}

/// Runtime limits passed to every operator call.
#[derive(Debug, Clone)]
pub struct OperatorEnv {
    /// Limits for REGEX_MATCH.
    pub patterns: PatternLimits,
}

/// Signature shared by every leaf operator.
pub type OperatorFn = fn(&FieldValue, &FieldValue, &OperatorEnv) -> Result<bool, EvaluationError>;

/// The dispatch table. `None` for operators with no leaf semantics.
pub fn lookup(op: Operator) -> Option<OperatorFn> {
    let f: OperatorFn = match op {
        Operator::Equals => equals,
        Operator::NotEquals => not_equals,
        Operator::GreaterThan => greater_than,
        Operator::LessThan => less_than,
        Operator::GreaterThanOrEqual => greater_than_or_equal,
        Operator::LessThanOrEqual => less_than_or_equal,
        Operator::Contains => contains,
        Operator::NotContains => not_contains,
        Operator::StartsWith => starts_with,
        Operator::EndsWith => ends_with,
        Operator::RegexMatch => regex_match,
        Operator::ContainsAny => contains_any,
        Operator::ContainsAll => contains_all,
        Operator::NotContainsAny => not_contains_any,
        Operator::IsTrue => is_true,
        Operator::IsFalse => is_false,
        Operator::IsNull => is_null,
        Operator::IsNotNull => is_not_null,
        Operator::And | Operator::Or | Operator::Not => return None,
    };
    Some(f)
}

// ── Comparison ──────────────────────────────────────────────────────

fn equals(
    actual: &FieldValue,
    expected: &FieldValue,
    _: &OperatorEnv,
) -> Result<bool, EvaluationError> {
    Ok(loosely_equal(actual, expected))
}

fn not_equals(
    actual: &FieldValue,
    expected: &FieldValue,
    _: &OperatorEnv,
) -> Result<bool, EvaluationError> {
    Ok(!loosely_equal(actual, expected))
}

fn loosely_equal(actual: &FieldValue, expected: &FieldValue) -> bool {
    if let (Some(a), Some(e)) = (actual.as_number(), expected.as_number()) {
        return a == e;
    }
    actual.to_text() == expected.to_text()
}

fn greater_than(a: &FieldValue, e: &FieldValue, _: &OperatorEnv) -> Result<bool, EvaluationError> {
    numeric_pair(Operator::GreaterThan, a, e).map(|(a, e)| a > e)
}

fn less_than(a: &FieldValue, e: &FieldValue, _: &OperatorEnv) -> Result<bool, EvaluationError> {
    numeric_pair(Operator::LessThan, a, e).map(|(a, e)| a < e)
}

fn greater_than_or_equal(
    a: &FieldValue,
    e: &FieldValue,
    _: &OperatorEnv,
) -> Result<bool, EvaluationError> {
    numeric_pair(Operator::GreaterThanOrEqual, a, e).map(|(a, e)| a >= e)
}

fn less_than_or_equal(
    a: &FieldValue,
    e: &FieldValue,
    _: &OperatorEnv,
) -> Result<bool, EvaluationError> {
    numeric_pair(Operator::LessThanOrEqual, a, e).map(|(a, e)| a <= e)
}

fn numeric_pair(
    operator: Operator,
    actual: &FieldValue,
    expected: &FieldValue,
) -> Result<(f64, f64), EvaluationError> {
    let coerce = |value: &FieldValue, side: &'static str| {
        value.as_number().ok_or_else(|| EvaluationError::NotNumeric {
            operator,
            side,
            kind: value.kind(),
            value: value.to_string(),
        })
    };
    Ok((coerce(actual, "context")?, coerce(expected, "operand")?))
}

// ── String ──────────────────────────────────────────────────────────

fn contains(a: &FieldValue, e: &FieldValue, _: &OperatorEnv) -> Result<bool, EvaluationError> {
    Ok(text_test(a, e, |hay, needle| hay.contains(needle)))
}

fn not_contains(a: &FieldValue, e: &FieldValue, _: &OperatorEnv) -> Result<bool, EvaluationError> {
    Ok(!text_test(a, e, |hay, needle| hay.contains(needle)))
}

fn starts_with(a: &FieldValue, e: &FieldValue, _: &OperatorEnv) -> Result<bool, EvaluationError> {
    Ok(text_test(a, e, |hay, needle| hay.starts_with(needle)))
}

fn ends_with(a: &FieldValue, e: &FieldValue, _: &OperatorEnv) -> Result<bool, EvaluationError> {
    Ok(text_test(a, e, |hay, needle| hay.ends_with(needle)))
}

fn text_test(
    actual: &FieldValue,
    expected: &FieldValue,
    test: impl Fn(&str, &str) -> bool,
) -> bool {
    match (actual.to_text(), expected.to_text()) {
        (Some(hay), Some(needle)) => test(&hay.to_lowercase(), &needle.to_lowercase()),
        _ => false,
    }
}

fn regex_match(
    actual: &FieldValue,
    expected: &FieldValue,
    env: &OperatorEnv,
) -> Result<bool, EvaluationError> {
    let FieldValue::String(pattern) = expected else {
        return Err(EvaluationError::InvalidOperand {
            operator: Operator::RegexMatch,
            found: expected.kind(),
        });
    };
    let Some(haystack) = actual.to_text() else {
        return Ok(false);
    };
    match_with_budget(pattern, &haystack, &env.patterns)
}

// ── Array ───────────────────────────────────────────────────────────

fn contains_any(a: &FieldValue, e: &FieldValue, _: &OperatorEnv) -> Result<bool, EvaluationError> {
    Ok(!folded_set(a).is_disjoint(&folded_set(e)))
}

fn contains_all(a: &FieldValue, e: &FieldValue, _: &OperatorEnv) -> Result<bool, EvaluationError> {
    Ok(folded_set(e).is_subset(&folded_set(a)))
}

fn not_contains_any(
    a: &FieldValue,
    e: &FieldValue,
    _: &OperatorEnv,
) -> Result<bool, EvaluationError> {
    Ok(folded_set(a).is_disjoint(&folded_set(e)))
}

fn folded_set(value: &FieldValue) -> BTreeSet<String> {
    value
        .to_string_set()
        .into_iter()
        .map(|s| s.trim().to_lowercase())
        .collect()
}

// ── Boolean ─────────────────────────────────────────────────────────

fn is_true(a: &FieldValue, _: &FieldValue, _: &OperatorEnv) -> Result<bool, EvaluationError> {
    Ok(a.as_bool() == Some(true))
}

fn is_false(a: &FieldValue, _: &FieldValue, _: &OperatorEnv) -> Result<bool, EvaluationError> {
    Ok(a.as_bool() == Some(false))
}

fn is_null(a: &FieldValue, _: &FieldValue, _: &OperatorEnv) -> Result<bool, EvaluationError> {
    Ok(a.is_null())
}

fn is_not_null(a: &FieldValue, _: &FieldValue, _: &OperatorEnv) -> Result<bool, EvaluationError> {
    Ok(!a.is_null())
}
