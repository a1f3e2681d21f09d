//! # Evaluation Context
//!
//! The flat, immutable field → value map a condition tree is evaluated
//! against. Field names are matched exactly; an absent field reads as
//! [`FieldValue::Null`].

use std::collections::BTreeMap;

use rgov_core::{FieldValue, UnsupportedValue};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A JSON document that cannot become an evaluation context.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    /// The top-level value is not an object.
    #[error("evaluation context must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    /// A field has a shape outside the value union.
    #[error("field {field:?}: {source}")]
    UnsupportedField {
        /// The offending field.
        field: String,
        /// Why its value was rejected.
        #[source]
        source: UnsupportedValue,
    },
}

static NULL: FieldValue = FieldValue::Null;

/// Field values visible to one evaluation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvaluationContext {
    fields: BTreeMap<String, FieldValue>,
}

impl EvaluationContext {
    /// An empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from prepared fields.
    pub fn from_fields(fields: BTreeMap<String, FieldValue>) -> Self {
        Self { fields }
    }

    /// Builder-style insert.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// The value for `field`, if the key is present.
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// The value for `field`, `Null` when absent.
    pub fn value_of(&self, field: &str) -> &FieldValue {
        self.fields.get(field).unwrap_or(&NULL)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl TryFrom<&serde_json::Value> for EvaluationContext {
    type Error = ContextError;

    fn try_from(value: &serde_json::Value) -> Result<Self, Self::Error> {
        let serde_json::Value::Object(map) = value else {
            let kind = match value {
                serde_json::Value::Array(_) => "array",
                serde_json::Value::String(_) => "string",
                serde_json::Value::Number(_) => "number",
                serde_json::Value::Bool(_) => "boolean",
                _ => "null",
            };
            return Err(ContextError::NotAnObject(kind));
        };
        let mut fields = BTreeMap::new();
        for (field, raw) in map {
            let v = FieldValue::try_from(raw).map_err(|source| ContextError::UnsupportedField {
                field: field.clone(),
                source,
            })?;
            fields.insert(field.clone(), v);
        }
        Ok(Self { fields })
    }
}
