//! # rgov-cli — Governance Policy Engine CLI
//!
//! Provides the `rgov` command-line interface over the policy engine.
//!
//! ## Subcommands
//!
//! - `rgov validate`: condition tree and policy document validation.
//! - `rgov evaluate`: one policy against one assessment.
//! - `rgov evaluate-all`: every ACTIVE policy in a set of files against one
//!   assessment.
//!
//! ```bash
//! rgov validate policies/eu-residency.yaml
//! rgov evaluate --policy policies/eu-residency.yaml --assessment asmt.json
//! rgov -v evaluate-all --policies policies/ --assessment asmt.json
//! ```
//!
//! Policy and assessment files may be YAML or JSON. Results are printed to
//! stdout as JSON; logs go to stderr.
//!
//! ## Exit codes
//!
//! | Code | Meaning |
//! |---|---|
//! | 0 | valid / passed / not blocked |
//! | 1 | validation problems / policy violated / enforcement blocks |
//! | 2 | operational or fatal evaluation error |

pub mod config;
pub mod evaluate;
pub mod input;
pub mod validate;

/// Exit code for a clean run.
pub const EXIT_OK: u8 = 0;
/// Exit code when the input was processed and found wanting.
pub const EXIT_FINDINGS: u8 = 1;
/// Exit code for operational failures.
pub const EXIT_ERROR: u8 = 2;

/// Print `value` to stdout as pretty JSON.
pub fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
