//! # Tree Evaluation
//!
//! A recursive walk over a [`ConditionTree`] against an
//! [`EvaluationContext`]. Each node yields one of three outcomes:
//!
//! - **True** / **False**: the usual boolean result.
//! - **Errored**: a leaf raised an [`EvaluationError`]. The error is recorded
//!   as a warning and the leaf counts as failed. NOT does not flip an errored
//!   child, so an error can never make a policy pass.
//!
//! ## Short-circuiting
//!
//! AND stops at the first child that is not True; OR stops at the first
//! True child. Leaves after the stopping point are never evaluated, so their
//! errors never surface.
//!
//! ## Failing leaves
//!
//! A failed policy reports the leaves responsible. For AND that is the
//! failing leaves of the stopping child; for OR it is the union over all
//! children. Under NOT, the roles swap: a leaf that passed beneath a NOT
//! that ends up false is reported as failing with `negated = true`.

use rgov_core::FieldValue;
use serde::{Deserialize, Serialize};

use crate::condition::{ConditionTree, LeafCondition, DEFAULT_MAX_DEPTH};
use crate::context::EvaluationContext;
use crate::error::{EvaluationError, FatalEvaluationError};
use crate::operator::{lookup, Operator, OperatorEnv};
use crate::pattern::PatternLimits;

/// Runtime limits for one evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluatorOptions {
    pub patterns: PatternLimits,
    /// Trees deeper than this are a fatal error.
    pub max_depth: usize,
}

impl Default for EvaluatorOptions {
    fn default() -> Self {
        Self {
            patterns: PatternLimits::default(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// The recorded outcome of one leaf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeafResult {
    pub field: String,
    pub operator: Operator,
    /// The leaf's operand.
    pub expected: FieldValue,
    /// The context value seen.
    pub actual: FieldValue,
    /// Raw operator result, before any enclosing NOT.
    pub passed: bool,
    /// Whether an odd number of NOTs sits above this leaf.
    pub negated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// An evaluation error absorbed into the trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationWarning {
    pub field: String,
    pub operator: Operator,
    pub code: String,
    pub message: String,
}

/// Everything learned from evaluating one tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationTrace {
    pub passed: bool,
    /// Leaves responsible for failure. Empty when `passed`.
    pub failing_leaves: Vec<LeafResult>,
    pub warnings: Vec<EvaluationWarning>,
    /// Leaves actually visited; short-circuited leaves are not counted.
    pub leaves_evaluated: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Truth {
    True,
    False,
    Errored,
}

#[derive(Debug)]
struct NodeOutcome {
    truth: Truth,
    failing: Vec<LeafResult>,
    satisfying: Vec<LeafResult>,
}

/// Walks a tree once against a fixed context.
pub struct Evaluator<'a> {
    context: &'a EvaluationContext,
    env: OperatorEnv,
    max_depth: usize,
    warnings: Vec<EvaluationWarning>,
    leaves_evaluated: usize,
}

impl<'a> Evaluator<'a> {
    pub fn new(context: &'a EvaluationContext, options: &EvaluatorOptions) -> Self {
        Self {
            context,
            env: OperatorEnv {
                patterns: options.patterns,
            },
            max_depth: options.max_depth,
            warnings: Vec::new(),
            leaves_evaluated: 0,
        }
    }

    /// Evaluate `tree`, consuming the evaluator.
    pub fn run(mut self, tree: &ConditionTree) -> Result<EvaluationTrace, FatalEvaluationError> {
        let outcome = self.node(tree, 1)?;
        let passed = outcome.truth == Truth::True;
        tracing::debug!(
            passed,
            leaves_evaluated = self.leaves_evaluated,
            warnings = self.warnings.len(),
            "condition tree evaluated"
        );
        Ok(EvaluationTrace {
            passed,
            failing_leaves: if passed { Vec::new() } else { outcome.failing },
            warnings: self.warnings,
            leaves_evaluated: self.leaves_evaluated,
        })
    }

    fn node(
        &mut self,
        tree: &ConditionTree,
        depth: usize,
    ) -> Result<NodeOutcome, FatalEvaluationError> {
        if depth > self.max_depth {
            return Err(FatalEvaluationError::DepthExceeded {
                max_depth: self.max_depth,
            });
        }
        match tree {
            ConditionTree::Leaf(leaf) => self.leaf(leaf),
            ConditionTree::And(children) => self.and(children, depth),
            ConditionTree::Or(children) => self.or(children, depth),
            ConditionTree::Not(child) => {
                let inner = self.node(child, depth + 1)?;
                Ok(negate(inner))
            }
        }
    }

    fn and(
        &mut self,
        children: &[ConditionTree],
        depth: usize,
    ) -> Result<NodeOutcome, FatalEvaluationError> {
        if children.is_empty() {
            return Err(FatalEvaluationError::EmptyComposite {
                operator: Operator::And,
            });
        }
        let mut satisfying = Vec::new();
        for child in children {
            let outcome = self.node(child, depth + 1)?;
            if outcome.truth != Truth::True {
                return Ok(outcome);
            }
            satisfying.extend(outcome.satisfying);
        }
        Ok(NodeOutcome {
            truth: Truth::True,
            failing: Vec::new(),
            satisfying,
        })
    }

    fn or(
        &mut self,
        children: &[ConditionTree],
        depth: usize,
    ) -> Result<NodeOutcome, FatalEvaluationError> {
        if children.is_empty() {
            return Err(FatalEvaluationError::EmptyComposite {
                operator: Operator::Or,
            });
        }
        let mut failing = Vec::new();
        let mut errored = false;
        for child in children {
            let outcome = self.node(child, depth + 1)?;
            match outcome.truth {
                Truth::True => return Ok(outcome),
                Truth::Errored => errored = true,
                Truth::False => {}
            }
            failing.extend(outcome.failing);
        }
        Ok(NodeOutcome {
            truth: if errored { Truth::Errored } else { Truth::False },
            failing,
            satisfying: Vec::new(),
        })
    }

    fn leaf(&mut self, leaf: &LeafCondition) -> Result<NodeOutcome, FatalEvaluationError> {
        let apply = lookup(leaf.operator).ok_or_else(|| FatalEvaluationError::UnhandledOperator {
            operator: leaf.operator,
            field: leaf.field.clone(),
        })?;
        self.leaves_evaluated += 1;

        let actual = self.context.value_of(&leaf.field);
        let result = if actual.is_null() && !leaf.operator.defined_for_missing() {
            Ok(false)
        } else {
            apply(actual, &leaf.value, &self.env)
        };

        let (truth, passed, error) = match result {
            Ok(true) => (Truth::True, true, None),
            Ok(false) => (Truth::False, false, None),
            Err(e) => {
                self.absorb(leaf, &e);
                (Truth::Errored, false, Some(e.to_string()))
            }
        };
        let record = LeafResult {
            field: leaf.field.clone(),
            operator: leaf.operator,
            expected: leaf.value.clone(),
            actual: actual.clone(),
            passed,
            negated: false,
            error,
        };
        Ok(if passed {
            NodeOutcome {
                truth,
                failing: Vec::new(),
                satisfying: vec![record],
            }
        } else {
            NodeOutcome {
                truth,
                failing: vec![record],
                satisfying: Vec::new(),
            }
        })
    }

    fn absorb(&mut self, leaf: &LeafCondition, error: &EvaluationError) {
        tracing::warn!(
            field = %leaf.field,
            operator = %leaf.operator,
            code = error.code(),
            error = %error,
            "leaf evaluation error treated as failed"
        );
        self.warnings.push(EvaluationWarning {
            field: leaf.field.clone(),
            operator: leaf.operator,
            code: error.code().to_string(),
            message: error.to_string(),
        });
    }
}

fn negate(inner: NodeOutcome) -> NodeOutcome {
    let flip = |leaves: Vec<LeafResult>| {
        leaves
            .into_iter()
            .map(|mut l| {
                l.negated = !l.negated;
                l
            })
            .collect()
    };
    match inner.truth {
        Truth::True => NodeOutcome {
            truth: Truth::False,
            failing: flip(inner.satisfying),
            satisfying: Vec::new(),
        },
        Truth::False => NodeOutcome {
            truth: Truth::True,
            failing: Vec::new(),
            satisfying: flip(inner.failing),
        },
        Truth::Errored => inner,
    }
}

/// Evaluate with default options.
pub fn evaluate(
    tree: &ConditionTree,
    context: &EvaluationContext,
) -> Result<EvaluationTrace, FatalEvaluationError> {
    evaluate_with(tree, context, &EvaluatorOptions::default())
}

/// Evaluate with explicit options.
pub fn evaluate_with(
    tree: &ConditionTree,
    context: &EvaluationContext,
    options: &EvaluatorOptions,
) -> Result<EvaluationTrace, FatalEvaluationError> {
    Evaluator::new(context, options).run(tree)
}
