//! # rgov-logic — Condition Trees and Their Evaluation
//!
//! A policy's logic is a [`ConditionTree`]: leaves compare one context field
//! against an operand, composites combine children with AND, OR and NOT.
//!
//! ## Architecture
//!
//! - **Condition** (`condition.rs`): the tagged tree, its JSON wire shape,
//!   and creation-time validation. A deserialized tree is always valid.
//!
//! - **Operator** (`operator.rs`): the operator enum and the fixed dispatch
//!   table of pure leaf functions with their coercion rules.
//!
//! - **Pattern** (`pattern.rs`): REGEX_MATCH execution under a size limit
//!   and a cooperative time budget.
//!
//! - **Context** (`context.rs`): the immutable field → value map a tree is
//!   evaluated against.
//!
//! - **Evaluation** (`evaluation.rs`): the short-circuiting walk producing an
//!   [`EvaluationTrace`] of failing leaves and absorbed warnings.
//!
//! ## Error layering
//!
//! | Error | Raised | Effect |
//! |---|---|---|
//! | [`ValidationError`] | tree construction | tree rejected |
//! | [`EvaluationError`] | one leaf | leaf fails, warning recorded |
//! | [`FatalEvaluationError`] | malformed tree at evaluation | whole policy fails |

pub mod condition;
pub mod context;
pub mod error;
pub mod evaluation;
pub mod operator;
pub mod pattern;

pub use condition::{
    validate_condition_tree, validate_condition_tree_with, ConditionTree, LeafCondition,
    RawCondition, ValidationIssue, ValidationIssueKind, ValidationOptions, ValidationResult,
    DEFAULT_MAX_DEPTH,
};
pub use context::{ContextError, EvaluationContext};
pub use error::{EvaluationError, FatalEvaluationError, ValidationError};
pub use evaluation::{
    evaluate, evaluate_with, EvaluationTrace, EvaluationWarning, Evaluator, EvaluatorOptions,
    LeafResult,
};
pub use operator::{Operator, OperatorGroup};
pub use pattern::PatternLimits;
