//! # Bulk Evaluation
//!
//! Partial-failure isolation, ordering and enforcement aggregation across a
//! tenant's active policies.

use proptest::prelude::*;
use rgov_agentic::{
    evaluate_all, Assessment, BulkEvaluator, EngineConfig, EnforcementAction, OverallStatus,
};
use rgov_core::{AssessmentId, GeographyAccountId, PolicyId, Severity, Timestamp};
use rgov_logic::{ConditionTree, Operator};
use rgov_state::{ActionIntent, EnforcementMode, Policy, PolicyActions, PolicyStatus};

fn policy(
    name: &str,
    severity: Severity,
    mode: EnforcementMode,
    conditions: ConditionTree,
) -> Policy {
    Policy {
        id: PolicyId::new(),
        geography_account_id: GeographyAccountId::new("geo-eu").unwrap(),
        version: 1,
        name: name.into(),
        description: String::new(),
        category: String::new(),
        severity,
        policy_type: String::new(),
        scope: String::new(),
        jurisdictions: Vec::new(),
        industries: Vec::new(),
        conditions,
        enforcement_mode: mode,
        auto_remediate: false,
        actions: PolicyActions::default(),
        status: PolicyStatus::Active,
        created_at: Timestamp::now(),
        updated_at: Timestamp::now(),
        history: Vec::new(),
        transitions: Vec::new(),
    }
}

fn assessment() -> Assessment {
    let mut a = Assessment::new(
        AssessmentId::new("asmt-42").unwrap(),
        GeographyAccountId::new("geo-eu").unwrap(),
    );
    a.jurisdictions = vec!["EU".into(), "UK".into()];
    a.tech_stack = vec!["AWS US-EAST-1".into()];
    a.risk_score = Some(81.0);
    a.human_oversight = Some(false);
    a
}

fn failing(name: &str, severity: Severity, mode: EnforcementMode) -> Policy {
    policy(name, severity, mode, ConditionTree::leaf("riskScore", Operator::LessThan, 50.0))
}

fn passing(name: &str) -> Policy {
    policy(
        name,
        Severity::Low,
        EnforcementMode::Prevent,
        ConditionTree::leaf("jurisdictions", Operator::Contains, "EU"),
    )
}

#[tokio::test]
async fn malformed_policy_is_isolated() {
    let mut broken = passing("broken");
    broken.conditions = ConditionTree::and(Vec::new());
    let policies = vec![
        failing("ceiling", Severity::High, EnforcementMode::Detect),
        broken.clone(),
        passing("residency"),
    ];

    let result = evaluate_all(policies, &assessment()).await;

    assert_eq!(result.evaluated_policies, 3);
    assert_eq!(result.passed_policies, 1);
    assert_eq!(result.failed_policies, 1);
    assert_eq!(result.errored_policies, 1);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].policy_id, broken.id);
    assert_eq!(result.errors[0].policy_name, "broken");
    assert_eq!(result.violations.len(), 1);
    assert_eq!(result.overall_status, OverallStatus::ViolationsDetected);
    assert_eq!(result.enforcement_action, EnforcementAction::None);
}

#[tokio::test]
async fn violations_sorted_by_severity_then_policy_id() {
    let policies = vec![
        failing("info", Severity::Info, EnforcementMode::Detect),
        failing("critical-a", Severity::Critical, EnforcementMode::Detect),
        failing("medium", Severity::Medium, EnforcementMode::Detect),
        failing("critical-b", Severity::Critical, EnforcementMode::Detect),
        failing("high", Severity::High, EnforcementMode::Detect),
    ];
    let result = evaluate_all(policies, &assessment()).await;

    let keys: Vec<(Severity, PolicyId)> =
        result.violations.iter().map(|v| (v.severity, v.policy_id)).collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
    assert_eq!(keys.first().map(|k| k.0), Some(Severity::Critical));
    assert_eq!(keys.last().map(|k| k.0), Some(Severity::Info));
}

#[tokio::test]
async fn prevent_dominates_remediate() {
    let mut remediate = failing("auto-fix", Severity::Medium, EnforcementMode::Remediate);
    remediate.auto_remediate = true;
    let prevent = failing("gate", Severity::High, EnforcementMode::Prevent);

    let only_remediate = evaluate_all(vec![remediate.clone()], &assessment()).await;
    assert_eq!(only_remediate.enforcement_action, EnforcementAction::RemediationTriggered);
    assert_eq!(only_remediate.blocking_violations, 0);
    assert!(only_remediate.blocking_violation_ids.is_empty());

    let both = evaluate_all(vec![remediate, prevent.clone()], &assessment()).await;
    assert_eq!(both.enforcement_action, EnforcementAction::Blocked);
    assert!(both.is_blocked());
    let blocking: Vec<_> = both
        .violations
        .iter()
        .filter(|v| v.policy_id == prevent.id)
        .map(|v| v.id)
        .collect();
    assert_eq!(both.blocking_violations, 1);
    assert_eq!(both.blocking_violation_ids, blocking);
}

#[tokio::test]
async fn blocking_violations_counts_every_prevent_violation() {
    let policies = vec![
        failing("gate-a", Severity::High, EnforcementMode::Prevent),
        failing("gate-b", Severity::Low, EnforcementMode::Prevent),
        failing("watch", Severity::Critical, EnforcementMode::Detect),
    ];
    let result = evaluate_all(policies, &assessment()).await;
    assert_eq!(result.violations.len(), 3);
    assert_eq!(result.blocking_violations, 2);
    assert_eq!(result.blocking_violation_ids.len(), 2);

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["blockingViolations"], 2);
}

#[tokio::test]
async fn passing_prevent_policy_does_not_block() {
    let result = evaluate_all(vec![passing("residency")], &assessment()).await;
    assert_eq!(result.overall_status, OverallStatus::AllPassed);
    assert_eq!(result.enforcement_action, EnforcementAction::None);
    assert!(result.violations.is_empty());
}

#[tokio::test]
async fn notifications_are_merged_across_policies() {
    let mut a = failing("a", Severity::High, EnforcementMode::Detect);
    a.actions.on_violation = vec![ActionIntent::new("EMAIL")];
    let mut b = failing("b", Severity::Low, EnforcementMode::Detect);
    b.actions.on_violation = vec![ActionIntent::new("WEBHOOK"), ActionIntent::new("EMAIL")];

    let result = evaluate_all(vec![a, b], &assessment()).await;
    assert_eq!(result.notifications_to_send.len(), 3);
}

#[tokio::test]
async fn results_do_not_depend_on_worker_count() {
    let policies: Vec<Policy> = (0..40)
        .map(|i| {
            let severity = Severity::all()[i % 5];
            if i % 3 == 0 {
                passing(&format!("pass-{i}"))
            } else {
                failing(&format!("fail-{i}"), severity, EnforcementMode::Detect)
            }
        })
        .collect();

    let narrow = BulkEvaluator::new(&EngineConfig {
        max_workers: 1,
        ..EngineConfig::default()
    })
    .evaluate_all(policies.clone(), &assessment())
    .await;
    let wide = BulkEvaluator::new(&EngineConfig {
        max_workers: 64,
        ..EngineConfig::default()
    })
    .evaluate_all(policies, &assessment())
    .await;

    assert_eq!(narrow.passed_policies, wide.passed_policies);
    assert_eq!(narrow.failed_policies, wide.failed_policies);
    let key = |r: &rgov_agentic::BulkResult| -> Vec<(Severity, PolicyId)> {
        r.violations.iter().map(|v| (v.severity, v.policy_id)).collect()
    };
    assert_eq!(key(&narrow), key(&wide));
}

#[tokio::test]
async fn result_serializes_camel_case() {
    let policies = vec![failing("x", Severity::High, EnforcementMode::Prevent)];
    let result = evaluate_all(policies, &assessment()).await;
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["overallStatus"], "VIOLATIONS_DETECTED");
    assert_eq!(json["enforcementAction"], "BLOCKED");
    assert_eq!(json["evaluatedPolicies"], 1);
    assert_eq!(json["blockingViolations"], 1);
    assert!(json["blockingViolationIds"].is_array());
}

fn arb_mode() -> impl Strategy<Value = EnforcementMode> {
    prop_oneof![
        Just(EnforcementMode::Detect),
        Just(EnforcementMode::Remediate),
        Just(EnforcementMode::Prevent),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn bulk_aggregates_are_consistent(
        specs in proptest::collection::vec((0usize..5, arb_mode(), any::<bool>()), 0..24),
        max_workers in 1usize..8,
    ) {
        let policies: Vec<Policy> = specs
            .iter()
            .enumerate()
            .map(|(i, (sev, mode, violated))| {
                let severity = Severity::all()[*sev];
                if *violated {
                    failing(&format!("p{i}"), severity, *mode)
                } else {
                    let tree = ConditionTree::leaf("jurisdictions", Operator::Contains, "EU");
                    policy(&format!("p{i}"), severity, *mode, tree)
                }
            })
            .collect();
        let prevent_violated = specs
            .iter()
            .filter(|(_, mode, violated)| *violated && *mode == EnforcementMode::Prevent)
            .count();

        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let config = EngineConfig { max_workers, ..EngineConfig::default() };
        let evaluator = BulkEvaluator::new(&config);
        let result = runtime.block_on(evaluator.evaluate_all(policies, &assessment()));

        prop_assert_eq!(result.evaluated_policies, specs.len());
        prop_assert_eq!(
            result.passed_policies + result.failed_policies + result.errored_policies,
            result.evaluated_policies
        );
        prop_assert_eq!(result.blocking_violations, prevent_violated);
        prop_assert_eq!(result.is_blocked(), prevent_violated > 0);
        let keys: Vec<(Severity, PolicyId)> =
            result.violations.iter().map(|v| (v.severity, v.policy_id)).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        prop_assert_eq!(keys, sorted);
    }
}
