//! # Error Taxonomy
//!
//! - [`ValidationError`] is raised only while building a tree (policy save).
//! - [`EvaluationError`] is a runtime problem inside one leaf of a valid
//!   tree. The evaluator absorbs it: the leaf fails and a warning is kept.
//! - [`FatalEvaluationError`] means the evaluator met a tree shape that
//!   validation would have rejected. It fails the whole policy evaluation.

use thiserror::Error;

use crate::condition::ValidationIssue;
use crate::operator::Operator;

/// A condition tree failed creation-time validation.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("condition tree rejected with {} issue(s): {}", issues.len(), summarize(issues))]
pub struct ValidationError {
    /// Every problem found, in tree order.
    pub issues: Vec<ValidationIssue>,
}

fn summarize(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|i| format!("{} {}", i.path, i.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// A runtime problem evaluating a single leaf.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    /// An ordering operator met a value that does not coerce to a number.
    #[error("{operator} requires numeric operands; {side} value {value:?} is a non-numeric {kind}")]
    NotNumeric {
        /// The operator being applied.
        operator: Operator,
        /// Which side failed to coerce (`context` or `operand`).
        side: &'static str,
        /// Shape of the offending value.
        kind: &'static str,
        /// Text form of the offending value.
        value: String,
    },

    /// The operand shape is unusable for the operator.
    #[error("{operator} cannot use a {found} operand")]
    InvalidOperand {
        /// The operator being applied.
        operator: Operator,
        /// Shape of the operand supplied.
        found: &'static str,
    },

    /// REGEX_MATCH exceeded its time budget.
    #[error("pattern {pattern:?} exceeded the {budget_ms}ms evaluation budget")]
    RegexTimeout {
        /// The pattern that ran out of time.
        pattern: String,
        /// The configured budget in milliseconds.
        budget_ms: u128,
    },

    /// The compiled pattern exceeded the configured size limit.
    #[error("pattern {pattern:?} exceeds the compiled size limit of {size_limit} bytes")]
    PatternTooComplex {
        /// The offending pattern.
        pattern: String,
        /// The configured limit.
        size_limit: usize,
    },

    /// The pattern does not compile.
    #[error("pattern {pattern:?} is invalid: {message}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// Compiler diagnostic.
        message: String,
    },
}

impl EvaluationError {
    /// Stable machine-readable code for the warning attached to the trace.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotNumeric { .. } => "NOT_NUMERIC",
            Self::InvalidOperand { .. } => "INVALID_OPERAND",
            Self::RegexTimeout { .. } => "REGEX_TIMEOUT",
            Self::PatternTooComplex { .. } => "PATTERN_TOO_COMPLEX",
            Self::InvalidPattern { .. } => "INVALID_PATTERN",
        }
    }
}

/// The evaluator met a tree that bypassed validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FatalEvaluationError {
    /// A leaf carries an operator with no registered handler.
    #[error("no handler registered for leaf operator {operator} on field {field:?}")]
    UnhandledOperator {
        /// The operator found in leaf position.
        operator: Operator,
        /// The leaf's field.
        field: String,
    },

    /// An AND/OR node has no children.
    #[error("{operator} node has no children")]
    EmptyComposite {
        /// AND or OR.
        operator: Operator,
    },

    /// The tree is nested deeper than the evaluator allows.
    #[error("condition tree exceeds maximum depth {max_depth}")]
    DepthExceeded {
        /// The configured maximum.
        max_depth: usize,
    },
}
