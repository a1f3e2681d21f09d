//! # Collaborator Interfaces
//!
//! The engine reads policies and assessments and writes violations and
//! notifications through these traits. The boundary layer supplies real
//! implementations; the in-memory ones here back the CLI and tests.
//!
//! All traits are synchronous. Stores are expected to be fast local calls or
//! to be wrapped by a caller that owns its own runtime concerns.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rgov_core::{AssessmentId, GeographyAccountId, ViolationId};
use rgov_state::{Policy, Violation};
use thiserror::Error;

use crate::assessment::Assessment;
use crate::synthesis::NotificationIntent;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("{kind} {id} already exists")]
    Conflict { kind: &'static str, id: String },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The dispatcher refused an intent type it does not handle.
    #[error("notification type {kind:?} rejected: {reason}")]
    Rejected { kind: String, reason: String },

    #[error("dispatcher unavailable: {0}")]
    Unavailable(String),
}

/// Source of policies for bulk evaluation.
pub trait PolicyStore: Send + Sync {
    /// ACTIVE policies belonging to `tenant`.
    fn active_policies(&self, tenant: &GeographyAccountId) -> Result<Vec<Policy>, StoreError>;
}

pub trait AssessmentStore: Send + Sync {
    fn get(&self, id: &AssessmentId) -> Result<Assessment, StoreError>;
}

/// Sink for synthesized violations.
pub trait ViolationStore: Send + Sync {
    /// Persist a new violation and return it as stored.
    fn create(&self, violation: Violation) -> Result<Violation, StoreError>;
}

pub trait NotificationDispatcher: Send + Sync {
    fn send(&self, intents: &[NotificationIntent]) -> Result<(), DispatchError>;
}

/// Assessments keyed by id.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAssessmentStore {
    data: Arc<RwLock<BTreeMap<AssessmentId, Assessment>>>,
}

impl InMemoryAssessmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an assessment, returning the previous one.
    pub fn insert(&self, assessment: Assessment) -> Option<Assessment> {
        self.data.write().insert(assessment.id.clone(), assessment)
    }
}

impl AssessmentStore for InMemoryAssessmentStore {
    fn get(&self, id: &AssessmentId) -> Result<Assessment, StoreError> {
        self.data.read().get(id).cloned().ok_or_else(|| StoreError::NotFound {
            kind: "assessment",
            id: id.to_string(),
        })
    }
}

/// Violations keyed by id.
#[derive(Debug, Clone, Default)]
pub struct InMemoryViolationStore {
    data: Arc<RwLock<BTreeMap<ViolationId, Violation>>>,
}

impl InMemoryViolationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &ViolationId) -> Option<Violation> {
        self.data.read().get(id).cloned()
    }

    pub fn list(&self) -> Vec<Violation> {
        self.data.read().values().cloned().collect()
    }

    pub fn for_assessment(&self, id: &AssessmentId) -> Vec<Violation> {
        self.data
            .read()
            .values()
            .filter(|v| &v.assessment_id == id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Atomically read-validate-update a stored violation.
    ///
    /// Returns `None` if the violation does not exist. On `Err` the closure
    /// must leave the record untouched; the lifecycle methods on
    /// [`Violation`] already guarantee this.
    pub fn try_update<R, E>(
        &self,
        id: &ViolationId,
        f: impl FnOnce(&mut Violation) -> Result<R, E>,
    ) -> Option<Result<R, E>> {
        self.data.write().get_mut(id).map(f)
    }
}

impl ViolationStore for InMemoryViolationStore {
    fn create(&self, violation: Violation) -> Result<Violation, StoreError> {
        let mut guard = self.data.write();
        if guard.contains_key(&violation.id) {
            return Err(StoreError::Conflict {
                kind: "violation",
                id: violation.id.to_string(),
            });
        }
        guard.insert(violation.id, violation.clone());
        Ok(violation)
    }
}

/// Dispatcher that records what it was asked to send.
#[derive(Debug, Clone, Default)]
pub struct RecordingDispatcher {
    sent: Arc<Mutex<Vec<NotificationIntent>>>,
    unavailable: bool,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// A dispatcher whose every `send` fails.
    pub fn unavailable() -> Self {
        Self {
            sent: Arc::default(),
            unavailable: true,
        }
    }

    pub fn sent(&self) -> Vec<NotificationIntent> {
        self.sent.lock().clone()
    }
}

impl NotificationDispatcher for RecordingDispatcher {
    fn send(&self, intents: &[NotificationIntent]) -> Result<(), DispatchError> {
        if self.unavailable {
            return Err(DispatchError::Unavailable("recording dispatcher disabled".into()));
        }
        self.sent.lock().extend_from_slice(intents);
        Ok(())
    }
}
