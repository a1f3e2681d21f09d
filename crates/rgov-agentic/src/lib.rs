//! # rgov-agentic — Policy Evaluation Engine
//!
//! Turns `(policy, assessment)` pairs into violations and enforcement
//! decisions.
//!
//! ```text
//! Assessment ──▶ build_context ──▶ EvaluationContext
//!                                        │
//! Policy.conditions ─────────────▶ rgov_logic::evaluate ──▶ EvaluationTrace
//!                                                               │
//!                               synthesize_violations / decide ◀┘
//!                                        │
//!                              Violation[] + EnforcementDecision
//! ```
//!
//! ## Modules
//!
//! - **assessment**: the assessment record and its projection onto a flat
//!   evaluation context.
//! - **synthesis**: failing leaves → violations; enforcement mode →
//!   decision and notification intents.
//! - **engine**: [`PolicyEngine::evaluate_one`].
//! - **bulk**: [`BulkEvaluator::evaluate_all`], a bounded tokio worker pool
//!   that isolates per-policy failures.
//! - **interfaces**: the store and dispatcher traits the boundary layer
//!   implements, plus in-memory versions.
//! - **registry**: an in-memory [`PolicyRegistry`] owning policy versions.
//! - **service**: [`GovernanceService`], load → evaluate → persist → notify.
//! - **config**: [`EngineConfig`] defaults, environment overrides, limits.

pub mod assessment;
pub mod bulk;
pub mod config;
pub mod engine;
pub mod interfaces;
pub mod registry;
pub mod service;
pub mod synthesis;

pub use assessment::{build_context, Assessment};
pub use bulk::{evaluate_all, BulkEvaluator, BulkResult, OverallStatus, PolicyFailure};
pub use config::{ConfigError, EngineConfig};
pub use engine::{evaluate_one, EngineError, PolicyEngine, PolicyOutcome};
pub use interfaces::{
    AssessmentStore, DispatchError, InMemoryAssessmentStore, InMemoryViolationStore,
    NotificationDispatcher, PolicyStore, RecordingDispatcher, StoreError, ViolationStore,
};
pub use registry::{DeleteMode, DeleteOutcome, PolicyRegistry, RegistryError};
pub use service::{GovernanceService, PersistFailure, ServiceError};
pub use synthesis::{
    decide, synthesize_violations, EnforcementAction, EnforcementDecision, NotificationIntent,
};
