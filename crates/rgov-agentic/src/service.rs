//! # Governance Service
//!
//! Load → evaluate → persist → notify, against the collaborator traits.
//! Violations are written only after the whole bulk run has completed, so a
//! cancelled evaluation persists nothing.
//!
//! Every violation write is attempted even when an earlier one fails, and
//! notifications are dispatched either way. Failed writes are reported
//! together in [`ServiceError::Persist`], which also carries the
//! [`BulkResult`] so the caller can retry them. Notification delivery
//! failures are logged and do not fail the call.

use std::sync::Arc;

use rgov_core::{AssessmentId, GeographyAccountId, ViolationId};
use thiserror::Error;

use crate::bulk::{BulkEvaluator, BulkResult};
use crate::config::EngineConfig;
use crate::interfaces::{
    AssessmentStore, NotificationDispatcher, PolicyStore, StoreError, ViolationStore,
};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The assessment belongs to another tenant.
    #[error("assessment {assessment} belongs to {actual}, not {expected}")]
    TenantMismatch {
        assessment: AssessmentId,
        expected: GeographyAccountId,
        actual: GeographyAccountId,
    },

    /// Some violations of a completed run could not be stored.
    #[error(
        "failed to persist {} of {} violations",
        .failures.len(),
        .result.violations.len()
    )]
    Persist {
        failures: Vec<PersistFailure>,
        result: Box<BulkResult>,
    },
}

/// One violation the store refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistFailure {
    pub violation: ViolationId,
    pub error: StoreError,
}

pub struct GovernanceService {
    policies: Arc<dyn PolicyStore>,
    assessments: Arc<dyn AssessmentStore>,
    violations: Arc<dyn ViolationStore>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    evaluator: BulkEvaluator,
}

impl GovernanceService {
    pub fn new(
        config: &EngineConfig,
        policies: Arc<dyn PolicyStore>,
        assessments: Arc<dyn AssessmentStore>,
        violations: Arc<dyn ViolationStore>,
        dispatcher: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        Self {
            policies,
            assessments,
            violations,
            dispatcher,
            evaluator: BulkEvaluator::new(config),
        }
    }

    /// Evaluate every ACTIVE policy of `tenant` against one assessment.
    pub async fn evaluate_assessment(
        &self,
        tenant: &GeographyAccountId,
        assessment_id: &AssessmentId,
    ) -> Result<BulkResult, ServiceError> {
        let assessment = self.assessments.get(assessment_id)?;
        if &assessment.geography_account_id != tenant {
            return Err(ServiceError::TenantMismatch {
                assessment: assessment.id,
                expected: tenant.clone(),
                actual: assessment.geography_account_id,
            });
        }
        let policies = self.policies.active_policies(tenant)?;
        let result = self.evaluator.evaluate_all(policies, &assessment).await;

        let mut failures = Vec::new();
        for violation in &result.violations {
            if let Err(error) = self.violations.create(violation.clone()) {
                tracing::warn!(
                    assessment = %assessment_id,
                    violation = %violation.id,
                    error = %error,
                    "violation not persisted"
                );
                failures.push(PersistFailure {
                    violation: violation.id,
                    error,
                });
            }
        }

        if !result.notifications_to_send.is_empty() {
            if let Err(e) = self.dispatcher.send(&result.notifications_to_send) {
                tracing::warn!(
                    assessment = %assessment_id,
                    intents = result.notifications_to_send.len(),
                    error = %e,
                    "notification dispatch failed"
                );
            }
        }

        if failures.is_empty() {
            Ok(result)
        } else {
            Err(ServiceError::Persist {
                failures,
                result: Box::new(result),
            })
        }
    }
}

impl std::fmt::Debug for GovernanceService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GovernanceService")
            .field("evaluator", &self.evaluator)
            .finish_non_exhaustive()
    }
}
