//! # Identity Newtypes
//!
//! Newtype wrappers for the identifiers the engine handles. Engine-minted
//! identifiers (policies, violations) are UUIDv4; identifiers supplied by the
//! surrounding service (assessments, tenants) are opaque non-empty strings.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::RgovError;

/// Unique identifier for a governance policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyId(pub Uuid);

/// Unique identifier for a recorded violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViolationId(pub Uuid);

/// Identifier of the assessment a policy is evaluated against.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AssessmentId(String);

/// Tenant scope of policies, assessments and violations.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GeographyAccountId(String);

impl PolicyId {
    /// Generate a new random policy identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PolicyId {
    fn default() -> Self {
        Self::new()
    }
}

impl ViolationId {
    /// Generate a new random violation identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ViolationId {
    fn default() -> Self {
        Self::new()
    }
}

impl AssessmentId {
    /// Create an assessment identifier, rejecting empty or blank input.
    pub fn new(id: impl Into<String>) -> Result<Self, RgovError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(RgovError::InvalidIdentifier(
                "assessment id must not be empty".into(),
            ));
        }
        Ok(Self(id))
    }

    /// Access the identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl GeographyAccountId {
    /// Create a tenant identifier, rejecting empty or blank input.
    pub fn new(id: impl Into<String>) -> Result<Self, RgovError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(RgovError::InvalidIdentifier(
                "geography account id must not be empty".into(),
            ));
        }
        Ok(Self(id))
    }

    /// Access the identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AssessmentId {
    type Error = RgovError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AssessmentId> for String {
    fn from(id: AssessmentId) -> Self {
        id.0
    }
}

impl TryFrom<String> for GeographyAccountId {
    type Error = RgovError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<GeographyAccountId> for String {
    fn from(id: GeographyAccountId) -> Self {
        id.0
    }
}

impl std::fmt::Display for PolicyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "policy:{}", self.0)
    }
}

impl std::fmt::Display for ViolationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "violation:{}", self.0)
    }
}

impl std::fmt::Display for AssessmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for GeographyAccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
