//! # Bulk Evaluation
//!
//! Evaluates every ACTIVE policy of a tenant against one assessment on a
//! bounded pool of tokio workers and merges the outcomes into a single
//! [`BulkResult`].
//!
//! The context is built once and shared read-only through an `Arc`. Jobs
//! are queued on one channel and outcomes come back on another, keyed by
//! input position. A policy whose tree cannot be evaluated, or whose worker
//! dies before reporting, is counted as errored and listed in
//! [`BulkResult::errors`]; the remaining policies are unaffected.
//!
//! Dropping the returned future aborts in-flight workers. Nothing shared is
//! written during evaluation, so cancellation leaves no partial state.

use std::collections::BTreeSet;
use std::sync::Arc;

use rgov_core::{AssessmentId, PolicyId, ViolationId};
use rgov_logic::EvaluationContext;
use rgov_state::{EnforcementMode, Policy, Violation};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;

use crate::assessment::{build_context, Assessment};
use crate::config::EngineConfig;
use crate::engine::{EngineError, PolicyEngine, PolicyOutcome};
use crate::synthesis::{EnforcementAction, NotificationIntent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverallStatus {
    AllPassed,
    ViolationsDetected,
}

/// A policy that could not be evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyFailure {
    pub policy_id: PolicyId,
    pub policy_name: String,
    pub message: String,
}

/// Merged outcome of one bulk run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkResult {
    pub assessment_id: AssessmentId,
    /// ACTIVE policies considered, including errored ones.
    pub evaluated_policies: usize,
    pub passed_policies: usize,
    /// Policies that evaluated and were violated. Errored policies are not
    /// counted here.
    pub failed_policies: usize,
    pub errored_policies: usize,
    /// Sorted by policy severity, most severe first, then policy id.
    pub violations: Vec<Violation>,
    /// Number of violations raised by PREVENT policies.
    pub blocking_violations: usize,
    /// Ids of those violations, in `violations` order.
    pub blocking_violation_ids: Vec<ViolationId>,
    pub overall_status: OverallStatus,
    pub enforcement_action: EnforcementAction,
    pub notifications_to_send: Vec<NotificationIntent>,
    pub errors: Vec<PolicyFailure>,
}

impl BulkResult {
    fn empty(assessment_id: AssessmentId) -> Self {
        Self {
            assessment_id,
            evaluated_policies: 0,
            passed_policies: 0,
            failed_policies: 0,
            errored_policies: 0,
            violations: Vec::new(),
            blocking_violations: 0,
            blocking_violation_ids: Vec::new(),
            overall_status: OverallStatus::AllPassed,
            enforcement_action: EnforcementAction::None,
            notifications_to_send: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn is_blocked(&self) -> bool {
        self.enforcement_action == EnforcementAction::Blocked
    }
}

type Job = (usize, Policy);
type Report = (usize, Result<PolicyOutcome, EngineError>);

/// Bounded concurrent evaluator.
#[derive(Debug, Clone)]
pub struct BulkEvaluator {
    engine: Arc<PolicyEngine>,
    max_workers: usize,
}

impl Default for BulkEvaluator {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl BulkEvaluator {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            engine: Arc::new(PolicyEngine::new(config)),
            max_workers: config.max_workers.max(1),
        }
    }

    pub fn engine(&self) -> &PolicyEngine {
        &self.engine
    }

    /// Evaluate the ACTIVE subset of `policies` against `assessment`.
    ///
    /// Inputs in any other status are skipped without being counted.
    pub async fn evaluate_all(&self, policies: Vec<Policy>, assessment: &Assessment) -> BulkResult {
        let active: Vec<Policy> = policies.into_iter().filter(Policy::is_active).collect();
        let total = active.len();
        if total == 0 {
            tracing::info!(assessment = %assessment.id, "no active policies to evaluate");
            return BulkResult::empty(assessment.id.clone());
        }

        let context = Arc::new(build_context(assessment));
        let names: Vec<(PolicyId, String, EnforcementMode)> = active
            .iter()
            .map(|p| (p.id, p.name.clone(), p.enforcement_mode))
            .collect();

        let (job_tx, job_rx) = mpsc::unbounded_channel::<Job>();
        for job in active.into_iter().enumerate() {
            // The receiver is alive until the workers below are spawned.
            let _ = job_tx.send(job);
        }
        drop(job_tx);
        let job_rx = Arc::new(Mutex::new(job_rx));
        let (report_tx, mut report_rx) = mpsc::unbounded_channel::<Report>();

        let workers = total.min(self.max_workers);
        let mut join_set = JoinSet::new();
        for worker in 0..workers {
            let engine = Arc::clone(&self.engine);
            let context = Arc::clone(&context);
            let jobs = Arc::clone(&job_rx);
            let reports = report_tx.clone();
            let assessment_id = assessment.id.clone();
            join_set.spawn(async move {
                run_worker(worker, engine, context, assessment_id, jobs, reports).await;
            });
        }
        drop(report_tx);

        let mut slots: Vec<Option<Result<PolicyOutcome, EngineError>>> = vec![None; total];
        while let Some((index, outcome)) = report_rx.recv().await {
            if let Some(slot) = slots.get_mut(index) {
                *slot = Some(outcome);
            }
        }
        while let Some(joined) = join_set.join_next().await {
            if let Err(e) = joined {
                tracing::warn!(error = %e, "bulk evaluation worker terminated abnormally");
            }
        }

        let result = merge(assessment.id.clone(), &names, slots);
        tracing::info!(
            assessment = %result.assessment_id,
            evaluated = result.evaluated_policies,
            passed = result.passed_policies,
            failed = result.failed_policies,
            errored = result.errored_policies,
            violations = result.violations.len(),
            action = ?result.enforcement_action,
            workers,
            "bulk evaluation complete"
        );
        result
    }
}

async fn run_worker(
    worker: usize,
    engine: Arc<PolicyEngine>,
    context: Arc<EvaluationContext>,
    assessment_id: AssessmentId,
    jobs: Arc<Mutex<mpsc::UnboundedReceiver<Job>>>,
    reports: mpsc::UnboundedSender<Report>,
) {
    loop {
        let next = jobs.lock().await.recv().await;
        let Some((index, policy)) = next else {
            break;
        };
        let outcome = engine.evaluate_in_context(&policy, &assessment_id, &context);
        if reports.send((index, outcome)).is_err() {
            tracing::debug!(worker, "report channel closed; worker exiting");
            break;
        }
        tokio::task::yield_now().await;
    }
}

fn merge(
    assessment_id: AssessmentId,
    policies: &[(PolicyId, String, EnforcementMode)],
    slots: Vec<Option<Result<PolicyOutcome, EngineError>>>,
) -> BulkResult {
    let mut result = BulkResult::empty(assessment_id);
    result.evaluated_policies = policies.len();
    let mut preventing: BTreeSet<PolicyId> = BTreeSet::new();

    for ((policy_id, name, mode), slot) in policies.iter().zip(slots) {
        match slot {
            Some(Ok(outcome)) if outcome.passed => result.passed_policies += 1,
            Some(Ok(outcome)) => {
                result.failed_policies += 1;
                if *mode == EnforcementMode::Prevent {
                    preventing.insert(*policy_id);
                }
                result.enforcement_action =
                    result.enforcement_action.max(outcome.enforcement_decision.action);
                result
                    .notifications_to_send
                    .extend(outcome.enforcement_decision.notifications_to_send);
                result.violations.extend(outcome.violations);
            }
            Some(Err(e)) => {
                tracing::warn!(policy = %policy_id, error = %e, "policy isolated from bulk result");
                result.errored_policies += 1;
                result.errors.push(PolicyFailure {
                    policy_id: *policy_id,
                    policy_name: name.clone(),
                    message: e.to_string(),
                });
            }
            None => {
                tracing::warn!(policy = %policy_id, "no outcome reported for policy");
                result.errored_policies += 1;
                result.errors.push(PolicyFailure {
                    policy_id: *policy_id,
                    policy_name: name.clone(),
                    message: "worker terminated before reporting".to_string(),
                });
            }
        }
    }

    result.violations.sort_by(|a, b| (a.severity, a.policy_id).cmp(&(b.severity, b.policy_id)));
    result.blocking_violation_ids = result
        .violations
        .iter()
        .filter(|v| preventing.contains(&v.policy_id))
        .map(|v| v.id)
        .collect();
    result.blocking_violations = result.blocking_violation_ids.len();
    if !result.violations.is_empty() {
        result.overall_status = OverallStatus::ViolationsDetected;
    }
    result
}

/// Bulk evaluation with default engine limits.
pub async fn evaluate_all(policies: Vec<Policy>, assessment: &Assessment) -> BulkResult {
    BulkEvaluator::default().evaluate_all(policies, assessment).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use rgov_core::{GeographyAccountId, Severity};
    use rgov_logic::{ConditionTree, FatalEvaluationError, Operator};
    use rgov_state::{PolicyActions, PolicyStatus};

    fn policy(name: &str, status: PolicyStatus, tree: ConditionTree) -> Policy {
        Policy {
            id: PolicyId::new(),
            geography_account_id: GeographyAccountId::new("geo-eu").unwrap(),
            version: 1,
            name: name.into(),
            description: String::new(),
            category: String::new(),
            severity: Severity::High,
            policy_type: String::new(),
            scope: String::new(),
            jurisdictions: Vec::new(),
            industries: Vec::new(),
            conditions: tree,
            enforcement_mode: EnforcementMode::Detect,
            auto_remediate: false,
            actions: PolicyActions::default(),
            status,
            created_at: rgov_core::Timestamp::now(),
            updated_at: rgov_core::Timestamp::now(),
            history: Vec::new(),
            transitions: Vec::new(),
        }
    }

    fn assessment() -> Assessment {
        let mut a = Assessment::new(
            AssessmentId::new("asmt-3").unwrap(),
            GeographyAccountId::new("geo-eu").unwrap(),
        );
        a.industry = Some("Finance".into());
        a
    }

    #[tokio::test]
    async fn empty_input_is_all_passed() {
        let result = evaluate_all(Vec::new(), &assessment()).await;
        assert_eq!(result.evaluated_policies, 0);
        assert_eq!(result.overall_status, OverallStatus::AllPassed);
        assert_eq!(result.enforcement_action, EnforcementAction::None);
    }

    #[tokio::test]
    async fn inactive_policies_are_not_counted() {
        let tree = ConditionTree::leaf("industry", Operator::Equals, "Retail");
        let policies = vec![
            policy("draft", PolicyStatus::Draft, tree.clone()),
            policy("deprecated", PolicyStatus::Deprecated, tree.clone()),
            policy("archived", PolicyStatus::Archived, tree.clone()),
            policy("active", PolicyStatus::Active, tree),
        ];
        let result = evaluate_all(policies, &assessment()).await;
        assert_eq!(result.evaluated_policies, 1);
        assert_eq!(result.failed_policies, 1);
        assert_eq!(result.violations.len(), 1);
    }

    #[tokio::test]
    async fn single_worker_still_drains_every_job() {
        let config = EngineConfig {
            max_workers: 1,
            ..EngineConfig::default()
        };
        let policies: Vec<Policy> = (0..12)
            .map(|i| {
                policy(
                    &format!("p{i}"),
                    PolicyStatus::Active,
                    ConditionTree::leaf("industry", Operator::Equals, "Finance"),
                )
            })
            .collect();
        let result = BulkEvaluator::new(&config).evaluate_all(policies, &assessment()).await;
        assert_eq!(result.evaluated_policies, 12);
        assert_eq!(result.passed_policies, 12);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn missing_report_is_errored() {
        let id = PolicyId::new();
        let names = vec![(id, "lost".to_string(), EnforcementMode::Prevent)];
        let result = merge(AssessmentId::new("a").unwrap(), &names, vec![None]);
        assert_eq!(result.errored_policies, 1);
        assert_eq!(result.errors[0].policy_id, id);
        assert_eq!(result.errors[0].message, "worker terminated before reporting");
        assert_eq!(result.overall_status, OverallStatus::AllPassed);
    }

    #[test]
    fn fatal_error_message_names_the_policy() {
        let id = PolicyId::new();
        let names = vec![(id, "broken".to_string(), EnforcementMode::Detect)];
        let err = EngineError::Fatal {
            policy_id: id,
            version: 3,
            source: FatalEvaluationError::EmptyComposite { operator: Operator::And },
        };
        let result = merge(AssessmentId::new("a").unwrap(), &names, vec![Some(Err(err))]);
        assert_eq!(result.failed_policies, 0);
        assert!(result.errors[0].message.contains(&id.to_string()));
    }
}
