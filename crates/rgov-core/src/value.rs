//! # Typed Field Values
//!
//! `FieldValue` is the closed set of shapes an evaluation-context field or a
//! leaf-condition operand can take. JSON input is resolved into it once, at
//! context-build or validation time; the evaluator never sees raw JSON.
//!
//! ## Coercions
//!
//! | Accessor | Null | Bool | Number | String | StringArray |
//! |---|---|---|---|---|---|
//! | `as_number` | – | – | finite value | parsed if numeric | – |
//! | `to_text` | – | `true`/`false` | shortest decimal | as-is | joined with `,` |
//! | `to_string_set` | empty | `[text]` | `[text]` | `[s]` | elements |
//! | `as_bool` | – | value | – | `true`/`false` (any case) | – |

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A typed value held by an evaluation context or a leaf operand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Absent or explicitly null.
    Null,
    /// Boolean flag.
    Bool(bool),
    /// Numeric value.
    Number(f64),
    /// Free text.
    String(String),
    /// Array of strings.
    StringArray(Vec<String>),
}

/// A JSON value that has no `FieldValue` representation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnsupportedValue {
    /// Objects are not part of the value union.
    #[error("objects are not supported as field values")]
    Object,

    /// Arrays may only contain strings.
    #[error("array element {index} is a {kind}; only string arrays are supported")]
    NonStringArrayElement {
        /// Position of the offending element.
        index: usize,
        /// JSON kind of the offending element.
        kind: &'static str,
    },

    /// Numbers must be representable as finite `f64`.
    #[error("number {0} is not representable as a finite float")]
    NonFiniteNumber(String),
}

impl FieldValue {
    /// Whether this value is `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Short name of the value's shape, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::StringArray(_) => "string array",
        }
    }

    /// Numeric coercion: numbers and numeric strings.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) if n.is_finite() => Some(*n),
            Self::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return None;
                }
                trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
            }
            _ => None,
        }
    }

    /// Boolean coercion: booleans and the strings `true`/`false`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::String(s) if s.trim().eq_ignore_ascii_case("true") => Some(true),
            Self::String(s) if s.trim().eq_ignore_ascii_case("false") => Some(false),
            _ => None,
        }
    }

    /// Text form used by string operators. `None` for `Null`.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Bool(b) => Some(b.to_string()),
            Self::Number(n) => Some(format_number(*n)),
            Self::String(s) => Some(s.clone()),
            Self::StringArray(items) => Some(items.join(",")),
        }
    }

    /// Set form used by array operators.
    pub fn to_string_set(&self) -> Vec<String> {
        match self {
            Self::Null => Vec::new(),
            Self::StringArray(items) => items.clone(),
            other => other.to_text().into_iter().collect(),
        }
    }
}

/// Render a number the way it reads in a policy: integral values without a
/// fractional part, everything else in shortest round-trip form.
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

impl TryFrom<&serde_json::Value> for FieldValue {
    type Error = UnsupportedValue;

    fn try_from(value: &serde_json::Value) -> Result<Self, Self::Error> {
        use serde_json::Value;
        match value {
            Value::Null => Ok(Self::Null),
            Value::Bool(b) => Ok(Self::Bool(*b)),
            Value::Number(n) => n
                .as_f64()
                .filter(|f| f.is_finite())
                .map(Self::Number)
                .ok_or_else(|| UnsupportedValue::NonFiniteNumber(n.to_string())),
            Value::String(s) => Ok(Self::String(s.clone())),
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(index, item)| match item {
                    Value::String(s) => Ok(s.clone()),
                    other => Err(UnsupportedValue::NonStringArrayElement {
                        index,
                        kind: json_kind(other),
                    }),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Self::StringArray),
            Value::Object(_) => Err(UnsupportedValue::Object),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(items: Vec<String>) -> Self {
        Self::StringArray(items)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.to_text() {
            Some(text) => f.write_str(&text),
            None => f.write_str("null"),
        }
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    use serde_json::Value;
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_scalars_convert() {
        assert_eq!(FieldValue::try_from(&json!(null)).unwrap(), FieldValue::Null);
        assert_eq!(FieldValue::try_from(&json!(true)).unwrap(), FieldValue::Bool(true));
        assert_eq!(FieldValue::try_from(&json!(7)).unwrap(), FieldValue::Number(7.0));
        assert_eq!(
            FieldValue::try_from(&json!("EU")).unwrap(),
            FieldValue::String("EU".into())
        );
    }

    #[test]
    fn string_arrays_convert_other_arrays_rejected() {
        assert_eq!(
            FieldValue::try_from(&json!(["EU", "UK"])).unwrap(),
            FieldValue::StringArray(vec!["EU".into(), "UK".into()])
        );
        assert_eq!(
            FieldValue::try_from(&json!(["EU", 3])).unwrap_err(),
            UnsupportedValue::NonStringArrayElement { index: 1, kind: "number" }
        );
        assert_eq!(
            FieldValue::try_from(&json!({"a": 1})).unwrap_err(),
            UnsupportedValue::Object
        );
    }

    #[test]
    fn numeric_coercion() {
        assert_eq!(FieldValue::String(" 42.5 ".into()).as_number(), Some(42.5));
        assert_eq!(FieldValue::String("high".into()).as_number(), None);
        assert_eq!(FieldValue::String("".into()).as_number(), None);
        assert_eq!(FieldValue::Bool(true).as_number(), None);
        assert_eq!(FieldValue::Number(f64::NAN).as_number(), None);
    }

    #[test]
    fn text_forms() {
        assert_eq!(FieldValue::Number(3.0).to_text().unwrap(), "3");
        assert_eq!(FieldValue::Number(0.75).to_text().unwrap(), "0.75");
        assert_eq!(
            FieldValue::StringArray(vec!["EU".into(), "UK".into()]).to_text().unwrap(),
            "EU,UK"
        );
        assert!(FieldValue::Null.to_text().is_none());
    }

    #[test]
    fn serde_untagged_roundtrip_shapes() {
        let v: FieldValue = serde_json::from_str("[\"a\",\"b\"]").unwrap();
        assert_eq!(v, FieldValue::StringArray(vec!["a".into(), "b".into()]));
        let v: FieldValue = serde_json::from_str("null").unwrap();
        assert!(v.is_null());
        assert_eq!(serde_json::to_string(&FieldValue::Number(12.0)).unwrap(), "12.0");
    }

    #[test]
    fn option_into_value() {
        let none: Option<String> = None;
        assert_eq!(FieldValue::from(none), FieldValue::Null);
        assert_eq!(FieldValue::from(Some(1.5)), FieldValue::Number(1.5));
    }
}
