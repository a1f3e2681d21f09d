//! # rgov-core — Foundational Types for the Policy Engine
//!
//! This crate is the leaf of the rgov dependency graph. It defines the
//! primitives every other crate shares: identifiers, timestamps, the
//! severity scale, the typed value union that conditions and evaluation
//! contexts are expressed in, and canonical digests for audit records.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `PolicyId`, `ViolationId`,
//!    `AssessmentId`, `GeographyAccountId`. A violation id cannot be passed
//!    where a policy id is expected.
//!
//! 2. **One typed value union.** `FieldValue` is the only shape a context
//!    field or a leaf operand can take: string, number, boolean, null, or an
//!    array of strings. Anything else is rejected at the boundary.
//!
//! 3. **UTC-only timestamps.** `Timestamp` is UTC with seconds precision.
//!
//! 4. **Digests flow through `CanonicalBytes`.** Condition-tree revisions are
//!    fingerprinted over JCS-canonical JSON, never over ad-hoc serialization.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `rgov-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod identity;
pub mod severity;
pub mod temporal;
pub mod value;

pub use canonical::CanonicalBytes;
pub use digest::{sha256_digest, ContentDigest, DigestAlgorithm};
pub use error::{CanonicalizationError, RgovError};
pub use identity::{AssessmentId, GeographyAccountId, PolicyId, ViolationId};
pub use severity::Severity;
pub use temporal::Timestamp;
pub use value::{FieldValue, UnsupportedValue};
