//! # Violation Synthesis and Enforcement
//!
//! A failed trace becomes one [`Violation`] per distinct failing leaf. The
//! policy's enforcement mode then decides what the caller should do:
//!
//! | Mode | `autoRemediate` | Action on failure |
//! |---|---|---|
//! | PREVENT | any | BLOCKED |
//! | REMEDIATE | true | REMEDIATION_TRIGGERED |
//! | REMEDIATE | false | NONE |
//! | DETECT | any | NONE |
//!
//! Every `onViolation` intent of a failed policy becomes a
//! [`NotificationIntent`] naming the violations it concerns.

use rgov_core::{AssessmentId, FieldValue, GeographyAccountId, PolicyId, Severity, ViolationId};
use rgov_logic::{EvaluationTrace, Operator};
use rgov_state::{EnforcementMode, Policy, Violation, ViolationData};
use serde::{Deserialize, Serialize};

/// What the caller should do about the assessed operation.
///
/// Ordered by strength, so the strongest of several decisions is the max.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnforcementAction {
    #[default]
    None,
    RemediationTriggered,
    Blocked,
}

/// A follow-up the dispatcher should deliver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationIntent {
    /// Intent type copied from the policy action.
    #[serde(rename = "type")]
    pub kind: String,
    /// Parameters copied verbatim from the policy action.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub params: serde_json::Map<String, serde_json::Value>,
    pub policy_id: PolicyId,
    pub policy_name: String,
    pub geography_account_id: GeographyAccountId,
    pub assessment_id: AssessmentId,
    pub severity: Severity,
    pub violation_ids: Vec<ViolationId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnforcementDecision {
    pub passed: bool,
    pub action: EnforcementAction,
    pub notifications_to_send: Vec<NotificationIntent>,
}

impl EnforcementDecision {
    pub fn pass() -> Self {
        Self {
            passed: true,
            action: EnforcementAction::None,
            notifications_to_send: Vec::new(),
        }
    }
}

/// One violation per distinct failing leaf, in trace order.
///
/// Severity and policy version are copied from `policy` as it is now.
pub fn synthesize_violations(
    policy: &Policy,
    assessment_id: &AssessmentId,
    trace: &EvaluationTrace,
) -> Vec<Violation> {
    if trace.passed {
        return Vec::new();
    }
    // FieldValue holds floats, so distinct keys are tracked by equality.
    let mut seen: Vec<(&str, Operator, &FieldValue, bool)> = Vec::new();
    trace
        .failing_leaves
        .iter()
        .filter(|leaf| {
            let key = (leaf.field.as_str(), leaf.operator, &leaf.expected, leaf.negated);
            if seen.contains(&key) {
                false
            } else {
                seen.push(key);
                true
            }
        })
        .map(|leaf| {
            Violation::open(
                policy.id,
                policy.version,
                policy.geography_account_id.clone(),
                assessment_id.clone(),
                policy.severity,
                ViolationData {
                    field: leaf.field.clone(),
                    operator: leaf.operator,
                    expected: leaf.expected.clone(),
                    actual: leaf.actual.clone(),
                    negated: leaf.negated,
                    warning: leaf.error.clone(),
                },
            )
        })
        .collect()
}

/// The enforcement decision for one policy's evaluation.
pub fn decide(
    policy: &Policy,
    assessment_id: &AssessmentId,
    passed: bool,
    violations: &[Violation],
) -> EnforcementDecision {
    if passed {
        return EnforcementDecision::pass();
    }
    let action = match policy.enforcement_mode {
        EnforcementMode::Prevent => EnforcementAction::Blocked,
        EnforcementMode::Remediate if policy.auto_remediate => {
            EnforcementAction::RemediationTriggered
        }
        EnforcementMode::Remediate | EnforcementMode::Detect => EnforcementAction::None,
    };
    let violation_ids: Vec<ViolationId> = violations.iter().map(|v| v.id).collect();
    let notifications_to_send = policy
        .actions
        .on_violation
        .iter()
        .map(|intent| NotificationIntent {
            kind: intent.kind.clone(),
            params: intent.params.clone(),
            policy_id: policy.id,
            policy_name: policy.name.clone(),
            geography_account_id: policy.geography_account_id.clone(),
            assessment_id: assessment_id.clone(),
            severity: policy.severity,
            violation_ids: violation_ids.clone(),
        })
        .collect();
    EnforcementDecision {
        passed: false,
        action,
        notifications_to_send,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rgov_logic::{evaluate, ConditionTree, EvaluationContext, LeafResult};
    use rgov_state::{ActionIntent, PolicyActions, PolicyStatus};
    use serde_json::json;

    fn policy(mode: EnforcementMode, auto_remediate: bool) -> Policy {
        Policy {
            id: PolicyId::new(),
            geography_account_id: GeographyAccountId::new("geo-eu").unwrap(),
            version: 4,
            name: "Oversight".into(),
            description: String::new(),
            category: String::new(),
            severity: Severity::Medium,
            policy_type: String::new(),
            scope: String::new(),
            jurisdictions: Vec::new(),
            industries: Vec::new(),
            conditions: ConditionTree::leaf("humanOversight", Operator::IsTrue, FieldValue::Null),
            enforcement_mode: mode,
            auto_remediate,
            actions: PolicyActions {
                on_violation: vec![
                    ActionIntent::new("EMAIL").with_param("to", json!("risk@example.com"))
                ],
            },
            status: PolicyStatus::Active,
            created_at: rgov_core::Timestamp::now(),
            updated_at: rgov_core::Timestamp::now(),
            history: Vec::new(),
            transitions: Vec::new(),
        }
    }

    fn asmt() -> AssessmentId {
        AssessmentId::new("asmt-1").unwrap()
    }

    fn failing_leaf(field: &str, negated: bool) -> LeafResult {
        LeafResult {
            field: field.into(),
            operator: Operator::Equals,
            expected: FieldValue::String("x".into()),
            actual: FieldValue::String("y".into()),
            passed: negated,
            negated,
            error: None,
        }
    }

    #[test]
    fn one_violation_per_failing_leaf_with_policy_snapshot() {
        let p = policy(EnforcementMode::Detect, false);
        let ctx = EvaluationContext::new().with("humanOversight", false);
        let trace = evaluate(&p.conditions, &ctx).unwrap();
        let violations = synthesize_violations(&p, &asmt(), &trace);
        assert_eq!(violations.len(), 1);
        let v = &violations[0];
        assert_eq!(v.policy_id, p.id);
        assert_eq!(v.policy_version, 4);
        assert_eq!(v.severity, Severity::Medium);
        assert_eq!(v.violation_type, "HUMAN_OVERSIGHT_VIOLATION");
        assert_eq!(v.violation_data.actual, FieldValue::Bool(false));
    }

    #[test]
    fn duplicate_leaves_collapse() {
        let p = policy(EnforcementMode::Detect, false);
        let trace = EvaluationTrace {
            passed: false,
            failing_leaves: vec![
                failing_leaf("industry", false),
                failing_leaf("industry", false),
                failing_leaf("industry", true),
            ],
            warnings: Vec::new(),
            leaves_evaluated: 3,
        };
        assert_eq!(synthesize_violations(&p, &asmt(), &trace).len(), 2);
    }

    #[test]
    fn leaves_with_same_text_but_different_values_stay_distinct() {
        let p = policy(EnforcementMode::Detect, false);
        let leaf = |expected: FieldValue| LeafResult {
            expected,
            ..failing_leaf("vendors", false)
        };
        let trace = EvaluationTrace {
            passed: false,
            failing_leaves: vec![
                leaf(FieldValue::String("3".into())),
                leaf(FieldValue::Number(3.0)),
                leaf(FieldValue::StringArray(vec!["a,b".into()])),
                leaf(FieldValue::StringArray(vec!["a".into(), "b".into()])),
                leaf(FieldValue::Number(3.0)),
            ],
            warnings: Vec::new(),
            leaves_evaluated: 5,
        };
        assert_eq!(synthesize_violations(&p, &asmt(), &trace).len(), 4);
    }

    #[test]
    fn passing_trace_yields_nothing() {
        let p = policy(EnforcementMode::Prevent, false);
        let trace = EvaluationTrace {
            passed: true,
            failing_leaves: Vec::new(),
            warnings: Vec::new(),
            leaves_evaluated: 1,
        };
        assert!(synthesize_violations(&p, &asmt(), &trace).is_empty());
        assert_eq!(decide(&p, &asmt(), true, &[]), EnforcementDecision::pass());
    }

    #[test]
    fn enforcement_mode_table() {
        let cases = [
            (EnforcementMode::Prevent, false, EnforcementAction::Blocked),
            (EnforcementMode::Prevent, true, EnforcementAction::Blocked),
            (EnforcementMode::Remediate, true, EnforcementAction::RemediationTriggered),
            (EnforcementMode::Remediate, false, EnforcementAction::None),
            (EnforcementMode::Detect, true, EnforcementAction::None),
        ];
        for (mode, auto, expected) in cases {
            let d = decide(&policy(mode, auto), &asmt(), false, &[]);
            assert!(!d.passed);
            assert_eq!(d.action, expected, "{mode} auto={auto}");
        }
    }

    #[test]
    fn notifications_carry_intent_and_violation_ids() {
        let p = policy(EnforcementMode::Detect, false);
        let ctx = EvaluationContext::new();
        let trace = evaluate(&p.conditions, &ctx).unwrap();
        let violations = synthesize_violations(&p, &asmt(), &trace);
        let d = decide(&p, &asmt(), trace.passed, &violations);
        assert_eq!(d.notifications_to_send.len(), 1);
        let n = &d.notifications_to_send[0];
        assert_eq!(n.kind, "EMAIL");
        assert_eq!(n.params["to"], "risk@example.com");
        assert_eq!(n.violation_ids, vec![violations[0].id]);

        let json = serde_json::to_value(n).unwrap();
        assert_eq!(json["type"], "EMAIL");
        assert!(json.get("violationIds").is_some());
    }

    #[test]
    fn action_strength_ordering() {
        assert!(EnforcementAction::Blocked > EnforcementAction::RemediationTriggered);
        assert!(EnforcementAction::RemediationTriggered > EnforcementAction::None);
    }
}
