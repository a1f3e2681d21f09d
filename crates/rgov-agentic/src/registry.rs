//! # Policy Registry
//!
//! In-memory owner of a set of policies. Every mutation runs the policy's
//! own lifecycle method under a single write lock, so the version check and
//! the version bump cannot interleave with another writer.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use rgov_core::{GeographyAccountId, PolicyId};
use rgov_logic::ValidationOptions;
use rgov_state::{NewPolicy, Policy, PolicyError, PolicyStatus, PolicyUpdate};
use thiserror::Error;

use crate::interfaces::{PolicyStore, StoreError};

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("policy {0} not found")]
    NotFound(PolicyId),

    #[error("policy {0} already registered")]
    Duplicate(PolicyId),

    #[error(transparent)]
    Policy(#[from] PolicyError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteMode {
    /// Transition to ARCHIVED and keep the record.
    Soft,
    /// Remove the record entirely.
    Hard,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeleteOutcome {
    Archived(Policy),
    Removed(Policy),
}

#[derive(Debug, Clone, Default)]
pub struct PolicyRegistry {
    data: Arc<RwLock<BTreeMap<PolicyId, Policy>>>,
    options: ValidationOptions,
}

impl PolicyRegistry {
    pub fn new(options: ValidationOptions) -> Self {
        Self {
            data: Arc::default(),
            options,
        }
    }

    /// Validate and register a new version-1 policy.
    pub fn create(&self, new: NewPolicy) -> Result<Policy, RegistryError> {
        let policy = Policy::create(new, &self.options)?;
        self.data.write().insert(policy.id, policy.clone());
        tracing::debug!(policy = %policy.id, status = %policy.status, "policy created");
        Ok(policy)
    }

    /// Register an already-built policy, e.g. one loaded from a file.
    pub fn insert(&self, policy: Policy) -> Result<(), RegistryError> {
        let mut guard = self.data.write();
        if guard.contains_key(&policy.id) {
            return Err(RegistryError::Duplicate(policy.id));
        }
        guard.insert(policy.id, policy);
        Ok(())
    }

    pub fn get(&self, id: &PolicyId) -> Option<Policy> {
        self.data.read().get(id).cloned()
    }

    /// Apply a content update against `expected_version`.
    ///
    /// Returns the policy as stored afterwards. A stale version or an
    /// invalid tree leaves the stored policy untouched.
    pub fn update(
        &self,
        id: &PolicyId,
        expected_version: u64,
        update: PolicyUpdate,
    ) -> Result<Policy, RegistryError> {
        let mut guard = self.data.write();
        let policy = guard.get_mut(id).ok_or(RegistryError::NotFound(*id))?;
        if policy.update(expected_version, update, &self.options)? {
            tracing::debug!(policy = %id, version = policy.version, "policy updated");
        }
        Ok(policy.clone())
    }

    pub fn transition(&self, id: &PolicyId, to: PolicyStatus) -> Result<Policy, RegistryError> {
        let mut guard = self.data.write();
        let policy = guard.get_mut(id).ok_or(RegistryError::NotFound(*id))?;
        let from = policy.status;
        if policy.transition(to)? {
            tracing::debug!(policy = %id, %from, %to, "policy transitioned");
        }
        Ok(policy.clone())
    }

    pub fn delete(&self, id: &PolicyId, mode: DeleteMode) -> Result<DeleteOutcome, RegistryError> {
        match mode {
            DeleteMode::Soft => {
                self.transition(id, PolicyStatus::Archived).map(DeleteOutcome::Archived)
            }
            DeleteMode::Hard => self
                .data
                .write()
                .remove(id)
                .map(DeleteOutcome::Removed)
                .ok_or(RegistryError::NotFound(*id)),
        }
    }

    /// Every policy of `tenant`, whatever its status.
    pub fn list(&self, tenant: &GeographyAccountId) -> Vec<Policy> {
        self.data
            .read()
            .values()
            .filter(|p| &p.geography_account_id == tenant)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl PolicyStore for PolicyRegistry {
    fn active_policies(&self, tenant: &GeographyAccountId) -> Result<Vec<Policy>, StoreError> {
        Ok(self
            .data
            .read()
            .values()
            .filter(|p| &p.geography_account_id == tenant && p.is_active())
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rgov_core::Severity;
    use rgov_logic::RawCondition;
    use rgov_state::{EnforcementMode, PolicyActions};

    fn new_policy(tenant: &str, status: PolicyStatus) -> NewPolicy {
        let conditions: RawCondition = serde_json::from_value(serde_json::json!({
            "field": "riskScore", "operator": "LESS_THAN", "value": 70
        }))
        .unwrap();
        NewPolicy {
            geography_account_id: GeographyAccountId::new(tenant).unwrap(),
            name: "Risk ceiling".into(),
            description: String::new(),
            category: String::new(),
            severity: Severity::High,
            policy_type: String::new(),
            scope: String::new(),
            jurisdictions: Vec::new(),
            industries: Vec::new(),
            conditions,
            enforcement_mode: EnforcementMode::Detect,
            auto_remediate: false,
            actions: PolicyActions::default(),
            status,
        }
    }

    #[test]
    fn update_checks_version_under_lock() {
        let registry = PolicyRegistry::default();
        let p = registry.create(new_policy("geo-eu", PolicyStatus::Draft)).unwrap();

        let update = PolicyUpdate {
            severity: Some(Severity::Critical),
            ..PolicyUpdate::default()
        };
        let v2 = registry.update(&p.id, 1, update.clone()).unwrap();
        assert_eq!(v2.version, 2);

        let err = registry.update(&p.id, 1, update).unwrap_err();
        assert!(matches!(
            err,
            RegistryError::Policy(PolicyError::StaleVersion { expected: 1, actual: 2 })
        ));
        assert_eq!(registry.get(&p.id).unwrap().version, 2);
    }

    #[test]
    fn invalid_tree_is_rejected_at_update() {
        let registry = PolicyRegistry::default();
        let p = registry.create(new_policy("geo-eu", PolicyStatus::Active)).unwrap();
        let bad: RawCondition = serde_json::from_value(serde_json::json!({
            "field": "riskScore", "operator": "ROUGHLY", "value": 70
        }))
        .unwrap();
        let err = registry
            .update(
                &p.id,
                1,
                PolicyUpdate {
                    conditions: Some(bad),
                    ..PolicyUpdate::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, RegistryError::Policy(PolicyError::InvalidConditions(_))));
        assert_eq!(registry.get(&p.id).unwrap(), p);
    }

    #[test]
    fn soft_and_hard_delete() {
        let registry = PolicyRegistry::default();
        let a = registry.create(new_policy("geo-eu", PolicyStatus::Active)).unwrap();
        let b = registry.create(new_policy("geo-eu", PolicyStatus::Draft)).unwrap();

        let soft = registry.delete(&a.id, DeleteMode::Soft).unwrap();
        let DeleteOutcome::Archived(archived) = soft else {
            panic!("expected soft delete");
        };
        assert_eq!(archived.status, PolicyStatus::Archived);
        assert!(registry.get(&a.id).is_some());

        assert!(matches!(
            registry.delete(&b.id, DeleteMode::Hard).unwrap(),
            DeleteOutcome::Removed(_)
        ));
        assert!(registry.get(&b.id).is_none());
        assert!(matches!(
            registry.delete(&b.id, DeleteMode::Hard),
            Err(RegistryError::NotFound(_))
        ));
    }

    #[test]
    fn active_policies_are_scoped_to_tenant() {
        let registry = PolicyRegistry::default();
        let eu = registry.create(new_policy("geo-eu", PolicyStatus::Active)).unwrap();
        registry.create(new_policy("geo-eu", PolicyStatus::Draft)).unwrap();
        registry.create(new_policy("geo-us", PolicyStatus::Active)).unwrap();

        let tenant = GeographyAccountId::new("geo-eu").unwrap();
        let active = registry.active_policies(&tenant).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, eu.id);
        assert_eq!(registry.list(&tenant).len(), 2);
    }

    #[test]
    fn transitions_follow_the_lifecycle() {
        let registry = PolicyRegistry::default();
        let p = registry.create(new_policy("geo-eu", PolicyStatus::Draft)).unwrap();
        assert!(matches!(
            registry.transition(&p.id, PolicyStatus::Deprecated),
            Err(RegistryError::Policy(PolicyError::InvalidTransition { .. }))
        ));
        let active = registry.transition(&p.id, PolicyStatus::Active).unwrap();
        assert_eq!(active.version, 1);
        assert_eq!(active.transitions.len(), 1);
        assert!(registry.insert(active).is_err());
    }
}
