//! # Single-Policy Evaluation
//!
//! [`PolicyEngine::evaluate_one`] runs one policy against one assessment
//! and returns the violations and enforcement decision. A malformed tree is
//! surfaced as [`EngineError::Fatal`]; the bulk orchestrator isolates the
//! same error to the offending policy.

use rgov_core::{AssessmentId, PolicyId};
use rgov_logic::{
    evaluate_with, EvaluationContext, EvaluationTrace, EvaluatorOptions, FatalEvaluationError,
};
use rgov_state::{Policy, Violation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::assessment::{build_context, Assessment};
use crate::config::EngineConfig;
use crate::synthesis::{decide, synthesize_violations, EnforcementDecision};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The policy's tree could not be evaluated at all.
    #[error("policy {policy_id} (version {version}) cannot be evaluated: {source}")]
    Fatal {
        policy_id: PolicyId,
        version: u64,
        #[source]
        source: FatalEvaluationError,
    },
}

/// Result of evaluating one policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyOutcome {
    pub policy_id: PolicyId,
    pub policy_version: u64,
    pub passed: bool,
    pub violations: Vec<Violation>,
    pub enforcement_decision: EnforcementDecision,
    pub trace: EvaluationTrace,
}

/// Stateless evaluator configured with engine limits.
#[derive(Debug, Clone, Default)]
pub struct PolicyEngine {
    options: EvaluatorOptions,
}

impl PolicyEngine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            options: config.evaluator_options(),
        }
    }

    pub fn options(&self) -> &EvaluatorOptions {
        &self.options
    }

    /// Evaluate `policy` against `assessment`, whatever the policy's status.
    pub fn evaluate_one(
        &self,
        policy: &Policy,
        assessment: &Assessment,
    ) -> Result<PolicyOutcome, EngineError> {
        let context = build_context(assessment);
        self.evaluate_in_context(policy, &assessment.id, &context)
    }

    /// Evaluate against an already-built context.
    pub fn evaluate_in_context(
        &self,
        policy: &Policy,
        assessment_id: &AssessmentId,
        context: &EvaluationContext,
    ) -> Result<PolicyOutcome, EngineError> {
        let trace = evaluate_with(&policy.conditions, context, &self.options).map_err(|source| {
            tracing::warn!(
                policy = %policy.id,
                version = policy.version,
                error = %source,
                "policy evaluation failed"
            );
            EngineError::Fatal {
                policy_id: policy.id,
                version: policy.version,
                source,
            }
        })?;

        let violations = synthesize_violations(policy, assessment_id, &trace);
        let enforcement_decision = decide(policy, assessment_id, trace.passed, &violations);
        tracing::debug!(
            policy = %policy.id,
            version = policy.version,
            assessment = %assessment_id,
            passed = trace.passed,
            violations = violations.len(),
            action = ?enforcement_decision.action,
            "policy evaluated"
        );
        Ok(PolicyOutcome {
            policy_id: policy.id,
            policy_version: policy.version,
            passed: trace.passed,
            violations,
            enforcement_decision,
            trace,
        })
    }
}

/// Evaluate with default engine limits.
pub fn evaluate_one(
    policy: &Policy,
    assessment: &Assessment,
) -> Result<PolicyOutcome, EngineError> {
    PolicyEngine::default().evaluate_one(policy, assessment)
}
