//! # Policy Lifecycle
//!
//! A policy is a versioned, tenant-scoped condition tree with enforcement
//! settings.
//!
//! ## States
//!
//! ```text
//! Draft ──▶ Active ──▶ Deprecated ──▶ Archived (terminal)
//!   │         │                          ▲
//!   │         └──────────────────────────┤
//!   └────────────────────────────────────┘
//! ```
//!
//! Only `Active` policies take part in bulk evaluation. Archiving is the
//! soft delete; a hard delete removes the policy from its store instead.
//!
//! ## Versioning
//!
//! `version` starts at 1. [`Policy::update`] takes the version the caller
//! last saw; a mismatch is rejected with [`PolicyError::StaleVersion`] and
//! the policy is left untouched. An accepted update that changes content
//! bumps the version by exactly one and appends a [`PolicyRevision`] with
//! the replaced tree. Status transitions do not bump the version.

use rgov_core::{
    sha256_digest, CanonicalBytes, CanonicalizationError, GeographyAccountId, PolicyId, Severity,
    Timestamp,
};
use rgov_logic::{ConditionTree, RawCondition, ValidationError, ValidationOptions};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ─── Status ─────────────────────────────────────────────────────────

/// The lifecycle status of a policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolicyStatus {
    /// Authored but not enforced.
    #[default]
    Draft,
    /// Enforced by bulk evaluation.
    Active,
    /// Retired but still visible.
    Deprecated,
    /// Soft-deleted (terminal).
    Archived,
}

impl PolicyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Active => "ACTIVE",
            Self::Deprecated => "DEPRECATED",
            Self::Archived => "ARCHIVED",
        }
    }

    /// Whether this state is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Archived)
    }

    /// Whether `self → to` is an allowed transition.
    pub fn can_transition_to(&self, to: PolicyStatus) -> bool {
        matches!(
            (self, to),
            (Self::Draft, Self::Active)
                | (Self::Draft, Self::Archived)
                | (Self::Active, Self::Deprecated)
                | (Self::Active, Self::Archived)
                | (Self::Deprecated, Self::Archived)
        )
    }
}

impl std::fmt::Display for PolicyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happens when a policy is violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnforcementMode {
    /// Record violations only.
    Detect,
    /// Record violations and block the assessed operation.
    Prevent,
    /// Record violations and, with `autoRemediate`, trigger remediation.
    Remediate,
}

impl std::fmt::Display for EnforcementMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Detect => "DETECT",
            Self::Prevent => "PREVENT",
            Self::Remediate => "REMEDIATE",
        })
    }
}

// ─── Actions ────────────────────────────────────────────────────────

/// One opaque follow-up intent, forwarded verbatim to the dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionIntent {
    /// Intent type, e.g. `EMAIL` or `WEBHOOK`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Everything else the author wrote on the intent.
    #[serde(flatten)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

impl ActionIntent {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            params: serde_json::Map::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyActions {
    #[serde(default)]
    pub on_violation: Vec<ActionIntent>,
}

// ─── Errors ─────────────────────────────────────────────────────────

/// Errors from policy creation, update and transitions.
#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("invalid policy transition: {from} -> {to}")]
    InvalidTransition { from: PolicyStatus, to: PolicyStatus },

    #[error("policy is in terminal state {state}")]
    TerminalState { state: PolicyStatus },

    /// The caller's version does not match the stored one.
    #[error("stale policy version: expected {expected}, current is {actual}")]
    StaleVersion { expected: u64, actual: u64 },

    #[error("policies must be created as DRAFT or ACTIVE, not {0}")]
    InvalidInitialStatus(PolicyStatus),

    #[error("policy name must not be empty")]
    EmptyName,

    #[error(transparent)]
    InvalidConditions(#[from] ValidationError),

    #[error("failed to fingerprint condition tree: {0}")]
    Digest(#[from] CanonicalizationError),
}

// ─── Records ────────────────────────────────────────────────────────

/// The content a policy had before an accepted update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyRevision {
    /// Version number the replaced content carried.
    pub version: u64,
    pub conditions: ConditionTree,
    pub severity: Severity,
    /// `sha256:<hex>` over the canonical JSON of `conditions`.
    pub conditions_digest: String,
    pub revised_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyTransitionRecord {
    pub from_status: PolicyStatus,
    pub to_status: PolicyStatus,
    pub timestamp: Timestamp,
}

// ─── Policy ─────────────────────────────────────────────────────────

fn initial_version() -> u64 {
    1
}

/// A governance policy at its current version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    #[serde(default)]
    pub id: PolicyId,
    pub geography_account_id: GeographyAccountId,
    #[serde(default = "initial_version")]
    pub version: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    pub severity: Severity,
    #[serde(default)]
    pub policy_type: String,
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub jurisdictions: Vec<String>,
    #[serde(default)]
    pub industries: Vec<String>,
    pub conditions: ConditionTree,
    pub enforcement_mode: EnforcementMode,
    #[serde(default)]
    pub auto_remediate: bool,
    #[serde(default)]
    pub actions: PolicyActions,
    #[serde(default)]
    pub status: PolicyStatus,
    #[serde(default = "Timestamp::now")]
    pub created_at: Timestamp,
    #[serde(default = "Timestamp::now")]
    pub updated_at: Timestamp,
    /// Replaced content, oldest first.
    #[serde(default)]
    pub history: Vec<PolicyRevision>,
    #[serde(default)]
    pub transitions: Vec<PolicyTransitionRecord>,
}

/// Input for [`Policy::create`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPolicy {
    pub geography_account_id: GeographyAccountId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    pub severity: Severity,
    #[serde(default)]
    pub policy_type: String,
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub jurisdictions: Vec<String>,
    #[serde(default)]
    pub industries: Vec<String>,
    pub conditions: RawCondition,
    pub enforcement_mode: EnforcementMode,
    #[serde(default)]
    pub auto_remediate: bool,
    #[serde(default)]
    pub actions: PolicyActions,
    #[serde(default)]
    pub status: PolicyStatus,
}

/// A partial content update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PolicyUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub severity: Option<Severity>,
    pub policy_type: Option<String>,
    pub scope: Option<String>,
    pub jurisdictions: Option<Vec<String>>,
    pub industries: Option<Vec<String>>,
    pub conditions: Option<RawCondition>,
    pub enforcement_mode: Option<EnforcementMode>,
    pub auto_remediate: Option<bool>,
    pub actions: Option<PolicyActions>,
}

impl Policy {
    /// Validate `new` and build a version-1 policy.
    pub fn create(new: NewPolicy, options: &ValidationOptions) -> Result<Self, PolicyError> {
        if !matches!(new.status, PolicyStatus::Draft | PolicyStatus::Active) {
            return Err(PolicyError::InvalidInitialStatus(new.status));
        }
        if new.name.trim().is_empty() {
            return Err(PolicyError::EmptyName);
        }
        let conditions = ConditionTree::from_raw(&new.conditions, options)?;
        let now = Timestamp::now();
        Ok(Self {
            id: PolicyId::new(),
            geography_account_id: new.geography_account_id,
            version: initial_version(),
            name: new.name,
            description: new.description,
            category: new.category,
            severity: new.severity,
            policy_type: new.policy_type,
            scope: new.scope,
            jurisdictions: new.jurisdictions,
            industries: new.industries,
            conditions,
            enforcement_mode: new.enforcement_mode,
            auto_remediate: new.auto_remediate,
            actions: new.actions,
            status: new.status,
            created_at: now,
            updated_at: now,
            history: Vec::new(),
            transitions: Vec::new(),
        })
    }

    /// Whether bulk evaluation includes this policy.
    pub fn is_active(&self) -> bool {
        self.status == PolicyStatus::Active
    }

    /// Digest of the current condition tree.
    pub fn conditions_digest(&self) -> Result<String, PolicyError> {
        digest_tree(&self.conditions)
    }

    /// Apply `update` if `expected_version` is current.
    ///
    /// Returns whether content changed (and so the version advanced). On
    /// any error the policy is unchanged.
    pub fn update(
        &mut self,
        expected_version: u64,
        update: PolicyUpdate,
        options: &ValidationOptions,
    ) -> Result<bool, PolicyError> {
        if self.status.is_terminal() {
            return Err(PolicyError::TerminalState { state: self.status });
        }
        if expected_version != self.version {
            return Err(PolicyError::StaleVersion {
                expected: expected_version,
                actual: self.version,
            });
        }
        if matches!(&update.name, Some(name) if name.trim().is_empty()) {
            return Err(PolicyError::EmptyName);
        }
        let conditions = update
            .conditions
            .as_ref()
            .map(|raw| ConditionTree::from_raw(raw, options))
            .transpose()?;

        let mut next = self.clone();
        next.apply(update, conditions);
        if next == *self {
            return Ok(false);
        }

        let revision = PolicyRevision {
            version: self.version,
            conditions: self.conditions.clone(),
            severity: self.severity,
            conditions_digest: digest_tree(&self.conditions)?,
            revised_at: Timestamp::now(),
        };
        next.version = self.version + 1;
        next.updated_at = revision.revised_at;
        next.history.push(revision);
        *self = next;
        Ok(true)
    }

    fn apply(&mut self, update: PolicyUpdate, conditions: Option<ConditionTree>) {
        let PolicyUpdate {
            name,
            description,
            category,
            severity,
            policy_type,
            scope,
            jurisdictions,
            industries,
            conditions: _,
            enforcement_mode,
            auto_remediate,
            actions,
        } = update;
        if let Some(v) = name {
            self.name = v;
        }
        if let Some(v) = description {
            self.description = v;
        }
        if let Some(v) = category {
            self.category = v;
        }
        if let Some(v) = severity {
            self.severity = v;
        }
        if let Some(v) = policy_type {
            self.policy_type = v;
        }
        if let Some(v) = scope {
            self.scope = v;
        }
        if let Some(v) = jurisdictions {
            self.jurisdictions = v;
        }
        if let Some(v) = industries {
            self.industries = v;
        }
        if let Some(v) = conditions {
            self.conditions = v;
        }
        if let Some(v) = enforcement_mode {
            self.enforcement_mode = v;
        }
        if let Some(v) = auto_remediate {
            self.auto_remediate = v;
        }
        if let Some(v) = actions {
            self.actions = v;
        }
    }

    /// DRAFT → ACTIVE.
    pub fn activate(&mut self) -> Result<bool, PolicyError> {
        self.transition(PolicyStatus::Active)
    }

    /// ACTIVE → DEPRECATED.
    pub fn deprecate(&mut self) -> Result<bool, PolicyError> {
        self.transition(PolicyStatus::Deprecated)
    }

    /// Soft delete: any live state → ARCHIVED.
    pub fn archive(&mut self) -> Result<bool, PolicyError> {
        self.transition(PolicyStatus::Archived)
    }

    /// Move to `to`. Returns `Ok(false)` if already there.
    pub fn transition(&mut self, to: PolicyStatus) -> Result<bool, PolicyError> {
        if self.status == to {
            return Ok(false);
        }
        if self.status.is_terminal() {
            return Err(PolicyError::TerminalState { state: self.status });
        }
        if !self.status.can_transition_to(to) {
            return Err(PolicyError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        let now = Timestamp::now();
        self.transitions.push(PolicyTransitionRecord {
            from_status: self.status,
            to_status: to,
            timestamp: now,
        });
        self.status = to;
        self.updated_at = now;
        Ok(true)
    }
}

fn digest_tree(tree: &ConditionTree) -> Result<String, PolicyError> {
    let canonical = CanonicalBytes::new(tree)?;
    Ok(sha256_digest(&canonical).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rgov_logic::Operator;
    use serde_json::json;

    fn raw(value: serde_json::Value) -> RawCondition {
        serde_json::from_value(value).unwrap()
    }

    fn new_policy(status: PolicyStatus) -> NewPolicy {
        NewPolicy {
            geography_account_id: GeographyAccountId::new("geo-eu").unwrap(),
            name: "EU data residency".into(),
            description: String::new(),
            category: "DATA_PRIVACY".into(),
            severity: Severity::High,
            policy_type: "RESIDENCY".into(),
            scope: "ASSESSMENT".into(),
            jurisdictions: vec!["EU".into()],
            industries: Vec::new(),
            conditions: raw(json!({
                "field": "jurisdictions",
                "operator": "CONTAINS",
                "value": "EU"
            })),
            enforcement_mode: EnforcementMode::Prevent,
            auto_remediate: false,
            actions: PolicyActions::default(),
            status,
        }
    }

    fn make_active() -> Policy {
        Policy::create(new_policy(PolicyStatus::Active), &ValidationOptions::default()).unwrap()
    }

    #[test]
    fn create_starts_at_version_one() {
        let p = make_active();
        assert_eq!(p.version, 1);
        assert!(p.is_active());
        assert!(p.history.is_empty());
        assert_eq!(p.created_at, p.updated_at);
    }

    #[test]
    fn create_rejects_bad_initial_state_and_trees() {
        let err = Policy::create(new_policy(PolicyStatus::Archived), &ValidationOptions::default())
            .unwrap_err();
        assert!(matches!(err, PolicyError::InvalidInitialStatus(PolicyStatus::Archived)));

        let mut bad = new_policy(PolicyStatus::Draft);
        bad.conditions = raw(json!({"operator": "NOT", "conditions": []}));
        let err = Policy::create(bad, &ValidationOptions::default()).unwrap_err();
        assert!(matches!(err, PolicyError::InvalidConditions(_)));

        let mut unnamed = new_policy(PolicyStatus::Draft);
        unnamed.name = "  ".into();
        assert!(matches!(
            Policy::create(unnamed, &ValidationOptions::default()).unwrap_err(),
            PolicyError::EmptyName
        ));
    }

    #[test]
    fn update_bumps_version_and_keeps_revision() {
        let mut p = make_active();
        let before = p.conditions.clone();
        let changed = p
            .update(
                1,
                PolicyUpdate {
                    severity: Some(Severity::Critical),
                    conditions: Some(raw(json!({
                        "field": "jurisdictions",
                        "operator": "CONTAINS",
                        "value": "UK"
                    }))),
                    ..PolicyUpdate::default()
                },
                &ValidationOptions::default(),
            )
            .unwrap();
        assert!(changed);
        assert_eq!(p.version, 2);
        assert_eq!(p.severity, Severity::Critical);
        assert_eq!(p.history.len(), 1);
        assert_eq!(p.history[0].version, 1);
        assert_eq!(p.history[0].severity, Severity::High);
        assert_eq!(p.history[0].conditions, before);
        assert!(p.history[0].conditions_digest.starts_with("sha256:"));
        assert_eq!(
            p.conditions,
            ConditionTree::leaf("jurisdictions", Operator::Contains, "UK")
        );
    }

    #[test]
    fn stale_update_is_rejected_without_mutation() {
        let mut p = make_active();
        let rename = |name: &str| PolicyUpdate {
            name: Some(name.into()),
            ..PolicyUpdate::default()
        };
        p.update(1, rename("v2"), &ValidationOptions::default()).unwrap();
        let snapshot = p.clone();
        let err = p.update(1, rename("v3"), &ValidationOptions::default()).unwrap_err();
        assert!(matches!(err, PolicyError::StaleVersion { expected: 1, actual: 2 }));
        assert_eq!(p, snapshot);
    }

    #[test]
    fn invalid_tree_in_update_leaves_policy_unchanged() {
        let mut p = make_active();
        let snapshot = p.clone();
        let err = p
            .update(
                1,
                PolicyUpdate {
                    severity: Some(Severity::Low),
                    conditions: Some(raw(json!({"field": "x", "operator": "NOPE"}))),
                    ..PolicyUpdate::default()
                },
                &ValidationOptions::default(),
            )
            .unwrap_err();
        assert!(matches!(err, PolicyError::InvalidConditions(_)));
        assert_eq!(p, snapshot);
    }

    #[test]
    fn no_op_update_keeps_version() {
        let mut p = make_active();
        let changed = p
            .update(
                1,
                PolicyUpdate { severity: Some(Severity::High), ..PolicyUpdate::default() },
                &ValidationOptions::default(),
            )
            .unwrap();
        assert!(!changed);
        assert_eq!(p.version, 1);
        assert!(p.history.is_empty());
    }

    #[test]
    fn lifecycle_transitions() {
        let mut p =
            Policy::create(new_policy(PolicyStatus::Draft), &ValidationOptions::default()).unwrap();
        assert!(!p.is_active());
        assert!(p.activate().unwrap());
        assert!(!p.activate().unwrap());
        assert!(p.deprecate().unwrap());
        assert!(p.archive().unwrap());
        assert_eq!(p.transitions.len(), 3);
        assert_eq!(p.version, 1);
        assert!(!p.archive().unwrap());
    }

    #[test]
    fn invalid_and_terminal_transitions() {
        let mut p = make_active();
        p.deprecate().unwrap();
        assert!(matches!(
            p.activate().unwrap_err(),
            PolicyError::InvalidTransition {
                from: PolicyStatus::Deprecated,
                to: PolicyStatus::Active,
            }
        ));
        p.archive().unwrap();
        assert!(matches!(
            p.activate().unwrap_err(),
            PolicyError::TerminalState { state: PolicyStatus::Archived }
        ));
        assert!(matches!(
            p.update(1, PolicyUpdate::default(), &ValidationOptions::default()).unwrap_err(),
            PolicyError::TerminalState { .. }
        ));
    }

    #[test]
    fn draft_can_be_archived_directly() {
        let mut p =
            Policy::create(new_policy(PolicyStatus::Draft), &ValidationOptions::default()).unwrap();
        assert!(p.archive().unwrap());
        assert_eq!(p.status, PolicyStatus::Archived);
    }

    #[test]
    fn deserializes_minimal_policy_document() {
        let p: Policy = serde_json::from_value(json!({
            "geographyAccountId": "geo-1",
            "name": "Oversight required",
            "severity": "MEDIUM",
            "conditions": {"field": "humanOversight", "operator": "IS_TRUE"},
            "enforcementMode": "DETECT",
            "actions": {"onViolation": [{"type": "EMAIL", "to": "risk@example.com"}]}
        }))
        .unwrap();
        assert_eq!(p.version, 1);
        assert_eq!(p.status, PolicyStatus::Draft);
        assert_eq!(p.actions.on_violation[0].kind, "EMAIL");
        assert_eq!(p.actions.on_violation[0].params["to"], "risk@example.com");
    }
}
