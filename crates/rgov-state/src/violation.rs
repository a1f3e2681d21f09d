//! # Violation Lifecycle
//!
//! One violation records one failing leaf of one policy evaluated against
//! one assessment. The severity and policy version are captured when the
//! violation is opened; later edits to the policy never reach back into it.
//!
//! ## States
//!
//! ```text
//! Open ──▶ Acknowledged ──▶ InRemediation ──▶ Resolved (terminal)
//!   │            │                               ▲
//!   │            └───────────────────────────────┤
//!   └────────────────────────────────────────────┘
//! ```
//!
//! Entering `Resolved` requires a non-blank `resolvedBy` and `resolution`.

use rgov_core::{
    AssessmentId, FieldValue, GeographyAccountId, PolicyId, Severity, Timestamp, ViolationId,
};
use rgov_logic::Operator;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ─── Status ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationStatus {
    Open,
    Acknowledged,
    InRemediation,
    Resolved,
}

impl ViolationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Acknowledged => "ACKNOWLEDGED",
            Self::InRemediation => "IN_REMEDIATION",
            Self::Resolved => "RESOLVED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved)
    }

    /// Whether `self → to` is an allowed transition.
    pub fn can_transition_to(&self, to: ViolationStatus) -> bool {
        matches!(
            (self, to),
            (Self::Open, Self::Acknowledged)
                | (Self::Open, Self::Resolved)
                | (Self::Acknowledged, Self::InRemediation)
                | (Self::Acknowledged, Self::Resolved)
                | (Self::InRemediation, Self::Resolved)
        )
    }
}

impl std::fmt::Display for ViolationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of entity a violation is raised against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TargetType {
    #[default]
    Assessment,
}

// ─── Errors ─────────────────────────────────────────────────────────

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ViolationError {
    #[error("invalid violation transition: {from} -> {to}")]
    InvalidTransition {
        from: ViolationStatus,
        to: ViolationStatus,
    },

    #[error("violation is in terminal state {state}")]
    TerminalState { state: ViolationStatus },

    /// Resolving requires both who and how.
    #[error("resolving a violation requires a non-empty {field}")]
    MissingResolution { field: &'static str },
}

// ─── Records ────────────────────────────────────────────────────────

/// Snapshot of the failing leaf that produced the violation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationData {
    pub field: String,
    pub operator: Operator,
    pub expected: FieldValue,
    pub actual: FieldValue,
    /// The leaf passed but sat under a NOT.
    #[serde(default)]
    pub negated: bool,
    /// Absorbed evaluation error on this leaf, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub resolved_by: String,
    pub resolution: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationTransitionRecord {
    pub from_status: ViolationStatus,
    pub to_status: ViolationStatus,
    pub timestamp: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
}

// ─── Violation ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    pub id: ViolationId,
    pub policy_id: PolicyId,
    /// Policy version that was evaluated.
    pub policy_version: u64,
    pub target_type: TargetType,
    pub assessment_id: AssessmentId,
    pub geography_account_id: GeographyAccountId,
    /// Copied from the policy at detection time.
    pub severity: Severity,
    pub violation_type: String,
    pub violation_data: ViolationData,
    pub status: ViolationStatus,
    pub detected_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_by: Option<String>,
    #[serde(default)]
    pub transitions: Vec<ViolationTransitionRecord>,
}

impl Violation {
    /// Open a new violation detected now.
    pub fn open(
        policy_id: PolicyId,
        policy_version: u64,
        geography_account_id: GeographyAccountId,
        assessment_id: AssessmentId,
        severity: Severity,
        violation_data: ViolationData,
    ) -> Self {
        Self {
            id: ViolationId::new(),
            policy_id,
            policy_version,
            target_type: TargetType::Assessment,
            assessment_id,
            geography_account_id,
            severity,
            violation_type: violation_type_for(&violation_data.field),
            violation_data,
            status: ViolationStatus::Open,
            detected_at: Timestamp::now(),
            resolved_at: None,
            resolution: None,
            resolved_by: None,
            transitions: Vec::new(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.status.is_terminal()
    }

    /// OPEN → ACKNOWLEDGED.
    pub fn acknowledge(&mut self, actor: Option<&str>) -> Result<bool, ViolationError> {
        self.transition(ViolationStatus::Acknowledged, actor, None)
    }

    /// ACKNOWLEDGED → IN_REMEDIATION.
    pub fn start_remediation(&mut self, actor: Option<&str>) -> Result<bool, ViolationError> {
        self.transition(ViolationStatus::InRemediation, actor, None)
    }

    /// Any open state → RESOLVED.
    pub fn resolve(&mut self, resolution: Resolution) -> Result<bool, ViolationError> {
        let actor = resolution.resolved_by.clone();
        self.transition(ViolationStatus::Resolved, Some(&actor), Some(resolution))
    }

    /// Move to `to`. Returns `Ok(false)` if already there.
    pub fn transition(
        &mut self,
        to: ViolationStatus,
        actor: Option<&str>,
        resolution: Option<Resolution>,
    ) -> Result<bool, ViolationError> {
        if self.status == to {
            return Ok(false);
        }
        if self.status.is_terminal() {
            return Err(ViolationError::TerminalState { state: self.status });
        }
        if !self.status.can_transition_to(to) {
            return Err(ViolationError::InvalidTransition {
                from: self.status,
                to,
            });
        }

        let now = Timestamp::now();
        if to == ViolationStatus::Resolved {
            let Resolution {
                resolved_by,
                resolution,
            } = resolution.ok_or(ViolationError::MissingResolution {
                field: "resolvedBy",
            })?;
            if resolved_by.trim().is_empty() {
                return Err(ViolationError::MissingResolution {
                    field: "resolvedBy",
                });
            }
            if resolution.trim().is_empty() {
                return Err(ViolationError::MissingResolution {
                    field: "resolution",
                });
            }
            self.resolved_by = Some(resolved_by);
            self.resolution = Some(resolution);
            self.resolved_at = Some(now);
        }

        self.transitions.push(ViolationTransitionRecord {
            from_status: self.status,
            to_status: to,
            timestamp: now,
            actor: actor.map(str::to_string),
        });
        self.status = to;
        Ok(true)
    }
}

/// Derive a violation type from a context field name.
///
/// `dataResidency` → `DATA_RESIDENCY_VIOLATION`,
/// `custom.vendorTier` → `CUSTOM_VENDOR_TIER_VIOLATION`.
pub fn violation_type_for(field: &str) -> String {
    let mut out = String::with_capacity(field.len() + 10);
    let mut prev: Option<char> = None;
    for c in field.chars() {
        if !c.is_ascii_alphanumeric() {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            prev = None;
            continue;
        }
        let boundary = c.is_ascii_uppercase()
            && matches!(prev, Some(p) if p.is_ascii_lowercase() || p.is_ascii_digit());
        if boundary && !out.ends_with('_') {
            out.push('_');
        }
        out.push(c.to_ascii_uppercase());
        prev = Some(c);
    }
    let trimmed = out.trim_end_matches('_');
    if trimmed.is_empty() {
        "CONDITION_VIOLATION".to_string()
    } else {
        format!("{trimmed}_VIOLATION")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(field: &str) -> ViolationData {
        ViolationData {
            field: field.into(),
            operator: Operator::NotContains,
            expected: FieldValue::String("AWS US-EAST-1".into()),
            actual: FieldValue::StringArray(vec!["AWS US-EAST-1".into()]),
            negated: false,
            warning: None,
        }
    }

    fn make_open() -> Violation {
        Violation::open(
            PolicyId::new(),
            3,
            GeographyAccountId::new("geo-eu").unwrap(),
            AssessmentId::new("asmt-42").unwrap(),
            Severity::High,
            data("techStack"),
        )
    }

    fn resolution() -> Resolution {
        Resolution {
            resolved_by: "analyst@example.com".into(),
            resolution: "Migrated to eu-central-1".into(),
        }
    }

    #[test]
    fn opens_with_snapshot() {
        let v = make_open();
        assert_eq!(v.status, ViolationStatus::Open);
        assert_eq!(v.policy_version, 3);
        assert_eq!(v.violation_type, "TECH_STACK_VIOLATION");
        assert_eq!(v.target_type, TargetType::Assessment);
        assert!(v.resolved_at.is_none());
    }

    #[test]
    fn full_lifecycle() {
        let mut v = make_open();
        assert!(v.acknowledge(Some("analyst")).unwrap());
        assert!(v.start_remediation(None).unwrap());
        assert!(v.resolve(resolution()).unwrap());
        assert!(v.is_resolved());
        assert_eq!(v.transitions.len(), 3);
        assert_eq!(v.resolved_by.as_deref(), Some("analyst@example.com"));
        assert!(v.resolved_at.is_some());
    }

    #[test]
    fn shortcuts_to_resolved() {
        let mut v = make_open();
        v.resolve(resolution()).unwrap();
        assert_eq!(v.status, ViolationStatus::Resolved);

        let mut v = make_open();
        v.acknowledge(None).unwrap();
        v.resolve(resolution()).unwrap();
        assert_eq!(v.status, ViolationStatus::Resolved);
    }

    #[test]
    fn same_state_is_idempotent() {
        let mut v = make_open();
        v.acknowledge(None).unwrap();
        assert!(!v.acknowledge(None).unwrap());
        assert_eq!(v.transitions.len(), 1);
        v.resolve(resolution()).unwrap();
        assert!(!v.resolve(resolution()).unwrap());
    }

    #[test]
    fn resolution_fields_required() {
        let mut v = make_open();
        let err = v.transition(ViolationStatus::Resolved, None, None).unwrap_err();
        assert_eq!(err, ViolationError::MissingResolution { field: "resolvedBy" });
        let err = v
            .resolve(Resolution {
                resolved_by: "a".into(),
                resolution: " ".into(),
            })
            .unwrap_err();
        assert_eq!(err, ViolationError::MissingResolution { field: "resolution" });
        assert_eq!(v.status, ViolationStatus::Open);
        assert!(v.transitions.is_empty());
    }

    #[test]
    fn invalid_transitions() {
        let mut v = make_open();
        assert_eq!(
            v.start_remediation(None).unwrap_err(),
            ViolationError::InvalidTransition {
                from: ViolationStatus::Open,
                to: ViolationStatus::InRemediation
            }
        );
        v.resolve(resolution()).unwrap();
        assert_eq!(
            v.acknowledge(None).unwrap_err(),
            ViolationError::TerminalState {
                state: ViolationStatus::Resolved
            }
        );
    }

    #[test]
    fn violation_type_derivation() {
        assert_eq!(violation_type_for("dataResidency"), "DATA_RESIDENCY_VIOLATION");
        assert_eq!(violation_type_for("jurisdictions"), "JURISDICTIONS_VIOLATION");
        assert_eq!(violation_type_for("custom.vendorTier"), "CUSTOM_VENDOR_TIER_VIOLATION");
        assert_eq!(violation_type_for("riskScore2Ext"), "RISK_SCORE2_EXT_VIOLATION");
        assert_eq!(violation_type_for("ALREADY_SNAKE"), "ALREADY_SNAKE_VIOLATION");
        assert_eq!(violation_type_for("..."), "CONDITION_VIOLATION");
    }

    #[test]
    fn serializes_camel_case() {
        let v = make_open();
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["status"], "OPEN");
        assert_eq!(json["targetType"], "ASSESSMENT");
        assert_eq!(json["violationData"]["field"], "techStack");
        assert!(json.get("resolvedAt").is_none());
    }
}
