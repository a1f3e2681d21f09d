//! # Condition Trees
//!
//! Wire shape (JSON or YAML):
//!
//! ```json
//! { "operator": "AND", "conditions": [
//!     { "field": "jurisdictions", "operator": "CONTAINS", "value": "EU" },
//!     { "operator": "NOT", "conditions": [
//!         { "field": "humanOversight", "operator": "IS_TRUE" } ] } ] }
//! ```
//!
//! [`RawCondition`] is that shape as deserialized, with nothing checked.
//! [`ConditionTree`] is the validated form. Going from one to the other
//! runs the same walk as [`validate_condition_tree_with`], which collects
//! every problem (not just the first) and addresses each by a JSON-pointer
//! path.

use rgov_core::FieldValue;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::operator::{Operator, OperatorGroup};
use crate::pattern::{check_pattern, DEFAULT_REGEX_SIZE_LIMIT};

/// Default maximum nesting depth of a condition tree.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// A condition node exactly as written by a policy author.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCondition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub operator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<RawCondition>>,
}

/// A single field comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeafCondition {
    pub field: String,
    pub operator: Operator,
    pub value: FieldValue,
}

/// A validated boolean expression over context fields.
///
/// The variants are public so callers can assemble trees in code; such
/// trees skip validation, and the evaluator reports any malformed shape
/// as a [`FatalEvaluationError`](crate::FatalEvaluationError).
///
/// Deserializing validates with [`ValidationOptions::default`], so a
/// configured depth or regex limit does not apply there. Authoring paths
/// take a [`RawCondition`] and call [`ConditionTree::from_raw`] with the
/// configured options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCondition", into = "RawCondition")]
pub enum ConditionTree {
    Leaf(LeafCondition),
    And(Vec<ConditionTree>),
    Or(Vec<ConditionTree>),
    Not(Box<ConditionTree>),
}

impl ConditionTree {
    pub fn leaf(
        field: impl Into<String>,
        operator: Operator,
        value: impl Into<FieldValue>,
    ) -> Self {
        Self::Leaf(LeafCondition {
            field: field.into(),
            operator,
            value: value.into(),
        })
    }

    pub fn and(children: Vec<ConditionTree>) -> Self {
        Self::And(children)
    }

    pub fn or(children: Vec<ConditionTree>) -> Self {
        Self::Or(children)
    }

    pub fn not(child: ConditionTree) -> Self {
        Self::Not(Box::new(child))
    }

    /// Validate `raw` with the given options and build the tree.
    pub fn from_raw(
        raw: &RawCondition,
        options: &ValidationOptions,
    ) -> Result<Self, ValidationError> {
        let mut walker = Walker::new(options);
        let tree = walker.node(raw, "", 1);
        match tree {
            Some(tree) if walker.issues.is_empty() => Ok(tree),
            _ => Err(ValidationError {
                issues: walker.issues,
            }),
        }
    }

    /// The operator at this node.
    pub fn operator(&self) -> Operator {
        match self {
            Self::Leaf(leaf) => leaf.operator,
            Self::And(_) => Operator::And,
            Self::Or(_) => Operator::Or,
            Self::Not(_) => Operator::Not,
        }
    }

    /// Nesting depth; a single leaf has depth 1.
    pub fn depth(&self) -> usize {
        match self {
            Self::Leaf(_) => 1,
            Self::And(children) | Self::Or(children) => {
                1 + children.iter().map(Self::depth).max().unwrap_or(0)
            }
            Self::Not(child) => 1 + child.depth(),
        }
    }

    /// Number of leaves in the tree.
    pub fn leaf_count(&self) -> usize {
        match self {
            Self::Leaf(_) => 1,
            Self::And(children) | Self::Or(children) => children.iter().map(Self::leaf_count).sum(),
            Self::Not(child) => child.leaf_count(),
        }
    }

    /// Convert back to the wire shape.
    pub fn to_raw(&self) -> RawCondition {
        match self {
            Self::Leaf(leaf) => RawCondition {
                field: Some(leaf.field.clone()),
                operator: leaf.operator.as_str().to_string(),
                value: match &leaf.value {
                    FieldValue::Null => None,
                    other => Some(field_value_to_json(other)),
                },
                conditions: None,
            },
            Self::And(children) | Self::Or(children) => RawCondition {
                field: None,
                operator: self.operator().as_str().to_string(),
                value: None,
                conditions: Some(children.iter().map(Self::to_raw).collect()),
            },
            Self::Not(child) => RawCondition {
                field: None,
                operator: Operator::Not.as_str().to_string(),
                value: None,
                conditions: Some(vec![child.to_raw()]),
            },
        }
    }
}

/// Validates under the default limits.
impl TryFrom<RawCondition> for ConditionTree {
    type Error = ValidationError;

    fn try_from(raw: RawCondition) -> Result<Self, Self::Error> {
        Self::from_raw(&raw, &ValidationOptions::default())
    }
}

impl From<ConditionTree> for RawCondition {
    fn from(tree: ConditionTree) -> Self {
        tree.to_raw()
    }
}

/// JSON form of a field value.
pub fn field_value_to_json(value: &FieldValue) -> serde_json::Value {
    use serde_json::Value;
    match value {
        FieldValue::Null => Value::Null,
        FieldValue::Bool(b) => Value::Bool(*b),
        FieldValue::Number(n) => serde_json::Number::from_f64(*n)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        FieldValue::String(s) => Value::String(s.clone()),
        FieldValue::StringArray(items) => {
            Value::Array(items.iter().cloned().map(Value::String).collect())
        }
    }
}

// ── Validation ──────────────────────────────────────────────────────

/// Limits applied while validating a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationOptions {
    /// Deepest allowed nesting; the root is at depth 1.
    pub max_depth: usize,
    /// Compiled size limit REGEX_MATCH operands must fit under.
    pub regex_size_limit: usize,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            regex_size_limit: DEFAULT_REGEX_SIZE_LIMIT,
        }
    }
}

/// Category of a validation problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationIssueKind {
    /// Operator name not in the operator enum.
    UnknownOperator,
    /// Wrong number of children for a composite.
    WrongArity,
    /// Leaf with a missing or blank field name.
    MissingField,
    /// Leaf carrying children, or composite carrying field/value.
    MixedNode,
    /// Operand unusable by the operator.
    InvalidOperand,
    /// Nested deeper than allowed.
    TooDeep,
}

/// One problem found in a tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    /// JSON pointer to the offending node or attribute.
    pub path: String,
    pub kind: ValidationIssueKind,
    pub message: String,
}

/// Outcome of [`validate_condition_tree`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationIssue>,
}

/// Validate a raw tree with default options.
pub fn validate_condition_tree(raw: &RawCondition) -> ValidationResult {
    validate_condition_tree_with(raw, &ValidationOptions::default())
}

/// Validate a raw tree, reporting every problem found.
pub fn validate_condition_tree_with(
    raw: &RawCondition,
    options: &ValidationOptions,
) -> ValidationResult {
    match ConditionTree::from_raw(raw, options) {
        Ok(_) => ValidationResult {
            valid: true,
            errors: Vec::new(),
        },
        Err(err) => ValidationResult {
            valid: false,
            errors: err.issues,
        },
    }
}

fn pointer(path: &str, suffix: &str) -> String {
    let p = format!("{path}{suffix}");
    if p.is_empty() {
        "/".to_string()
    } else {
        p
    }
}

struct Walker<'a> {
    options: &'a ValidationOptions,
    issues: Vec<ValidationIssue>,
}

impl<'a> Walker<'a> {
    fn new(options: &'a ValidationOptions) -> Self {
        Self {
            options,
            issues: Vec::new(),
        }
    }

    fn issue(&mut self, path: String, kind: ValidationIssueKind, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            path,
            kind,
            message: message.into(),
        });
    }

    /// Returns the built node, or `None` if this subtree has any issue.
    fn node(&mut self, raw: &RawCondition, path: &str, depth: usize) -> Option<ConditionTree> {
        if depth > self.options.max_depth {
            self.issue(
                pointer(path, ""),
                ValidationIssueKind::TooDeep,
                format!("nesting exceeds maximum depth {}", self.options.max_depth),
            );
            return None;
        }

        let operator = match raw.operator.parse::<Operator>() {
            Ok(op) => op,
            Err(_) => {
                self.issue(
                    pointer(path, "/operator"),
                    ValidationIssueKind::UnknownOperator,
                    format!("unknown operator {:?}", raw.operator),
                );
                // Still report problems further down.
                if let Some(children) = &raw.conditions {
                    self.children(children, path, depth);
                }
                return None;
            }
        };

        if operator.is_logical() {
            self.composite(operator, raw, path, depth)
        } else {
            self.leaf(operator, raw, path)
        }
    }

    fn children(
        &mut self,
        children: &[RawCondition],
        path: &str,
        depth: usize,
    ) -> Vec<Option<ConditionTree>> {
        children
            .iter()
            .enumerate()
            .map(|(i, child)| self.node(child, &format!("{path}/conditions/{i}"), depth + 1))
            .collect()
    }

    fn composite(
        &mut self,
        operator: Operator,
        raw: &RawCondition,
        path: &str,
        depth: usize,
    ) -> Option<ConditionTree> {
        let before = self.issues.len();

        if raw.field.is_some() {
            self.issue(
                pointer(path, "/field"),
                ValidationIssueKind::MixedNode,
                format!("{operator} node must not carry a field"),
            );
        }
        if raw.value.is_some() {
            self.issue(
                pointer(path, "/value"),
                ValidationIssueKind::MixedNode,
                format!("{operator} node must not carry a value"),
            );
        }

        let raw_children = raw.conditions.as_deref().unwrap_or(&[]);
        match operator {
            Operator::Not if raw_children.len() != 1 => self.issue(
                pointer(path, "/conditions"),
                ValidationIssueKind::WrongArity,
                format!("NOT takes exactly one condition, found {}", raw_children.len()),
            ),
            Operator::And | Operator::Or if raw_children.is_empty() => self.issue(
                pointer(path, "/conditions"),
                ValidationIssueKind::WrongArity,
                format!("{operator} takes at least one condition"),
            ),
            _ => {}
        }

        let built = self.children(raw_children, path, depth);
        if self.issues.len() != before {
            return None;
        }
        let mut built: Vec<ConditionTree> = built.into_iter().collect::<Option<_>>()?;
        match operator {
            Operator::And => Some(ConditionTree::And(built)),
            Operator::Or => Some(ConditionTree::Or(built)),
            _ => built.pop().map(ConditionTree::not),
        }
    }

    fn leaf(
        &mut self,
        operator: Operator,
        raw: &RawCondition,
        path: &str,
    ) -> Option<ConditionTree> {
        let before = self.issues.len();

        if raw.conditions.is_some() {
            self.issue(
                pointer(path, "/conditions"),
                ValidationIssueKind::MixedNode,
                format!("{operator} is a leaf operator and cannot have conditions"),
            );
        }

        let field = raw.field.as_deref().map(str::trim).unwrap_or("");
        if field.is_empty() {
            self.issue(
                pointer(path, "/field"),
                ValidationIssueKind::MissingField,
                format!("{operator} requires a non-empty field"),
            );
        }

        let value = match raw.value.as_ref().map(FieldValue::try_from).transpose() {
            Ok(v) => v.unwrap_or(FieldValue::Null),
            Err(e) => {
                self.issue(
                    pointer(path, "/value"),
                    ValidationIssueKind::InvalidOperand,
                    e.to_string(),
                );
                FieldValue::Null
            }
        };
        if self.issues.len() == before {
            if let Err(message) = self.check_operand(operator, &value) {
                self.issue(pointer(path, "/value"), ValidationIssueKind::InvalidOperand, message);
            }
        }

        if self.issues.len() != before {
            return None;
        }
        Some(ConditionTree::Leaf(LeafCondition {
            field: field.to_string(),
            operator,
            value,
        }))
    }

    fn check_operand(&self, operator: Operator, value: &FieldValue) -> Result<(), String> {
        if operator.requires_operand() && value.is_null() {
            return Err(format!("{operator} requires a value"));
        }
        if operator.is_ordering() && value.as_number().is_none() {
            return Err(format!(
                "{operator} requires a numeric value, found {} {value}",
                value.kind()
            ));
        }
        match operator.group() {
            OperatorGroup::String if operator == Operator::RegexMatch => match value {
                FieldValue::String(pattern) => {
                    check_pattern(pattern, self.options.regex_size_limit).map_err(|e| e.to_string())
                }
                other => Err(format!(
                    "REGEX_MATCH requires a string pattern, found {}",
                    other.kind()
                )),
            },
            OperatorGroup::String if matches!(value, FieldValue::StringArray(_)) => {
                Err(format!("{operator} requires a scalar value, found a string array"))
            }
            OperatorGroup::Array => match value {
                FieldValue::StringArray(items) if items.is_empty() => {
                    Err(format!("{operator} requires a non-empty array"))
                }
                FieldValue::StringArray(_) | FieldValue::String(_) => Ok(()),
                other => Err(format!(
                    "{operator} requires an array of strings, found {}",
                    other.kind()
                )),
            },
            _ => Ok(()),
        }
    }
}
