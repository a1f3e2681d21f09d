//! # rgov-state — Policy and Violation Lifecycles
//!
//! Runtime-checked state machines for the two persistent entities of the
//! engine. Both keep an ordered transition log; neither performs I/O.
//!
//! ## State Machines
//!
//! - **Policy** (`policy.rs`): `Draft → Active → Deprecated → Archived`,
//!   plus `Active → Archived` and `Draft → Archived`. Content updates are
//!   guarded by an optimistic version number and retain the replaced tree
//!   as a [`PolicyRevision`].
//!
//! - **Violation** (`violation.rs`):
//!   `Open → Acknowledged → InRemediation → Resolved`, with the shortcuts
//!   `Open → Resolved` and `Acknowledged → Resolved`. Entering `Resolved`
//!   requires who resolved it and how.
//!
//! Requesting a transition into the current state is a successful no-op on
//! both machines, so retried requests are harmless.

pub mod policy;
pub mod violation;

// ─── Policy re-exports ──────────────────────────────────────────────

pub use policy::{
    ActionIntent, EnforcementMode, NewPolicy, Policy, PolicyActions, PolicyError, PolicyRevision,
    PolicyStatus, PolicyTransitionRecord, PolicyUpdate,
};

// ─── Violation re-exports ───────────────────────────────────────────

pub use violation::{
    violation_type_for, Resolution, TargetType, Violation, ViolationData, ViolationError,
    ViolationStatus, ViolationTransitionRecord,
};
