//! # Evaluate Subcommands
//!
//! `rgov evaluate` runs one policy file against one assessment and prints
//! the [`PolicyOutcome`]. `rgov evaluate-all` loads a set of policy files
//! into a registry, selects the ACTIVE policies of the assessment's tenant,
//! and prints the [`BulkResult`].

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use rgov_agentic::{
    BulkEvaluator, BulkResult, EngineConfig, EngineError, PolicyEngine, PolicyOutcome,
    PolicyRegistry, PolicyStore,
};
use rgov_state::Policy;

use crate::input::{collect_documents, load_assessment, load_policies};
use crate::{print_json, EXIT_ERROR, EXIT_FINDINGS, EXIT_OK};

/// Arguments for `rgov evaluate`.
#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Policy document (YAML or JSON) holding exactly one policy.
    #[arg(long, value_name = "FILE")]
    pub policy: PathBuf,

    /// Assessment document (YAML or JSON).
    #[arg(long, value_name = "FILE")]
    pub assessment: PathBuf,
}

/// Arguments for `rgov evaluate-all`.
#[derive(Args, Debug)]
pub struct EvaluateAllArgs {
    /// Policy files or directories of them.
    #[arg(long, value_name = "DIR|FILE", num_args = 1.., required = true)]
    pub policies: Vec<PathBuf>,

    /// Assessment document (YAML or JSON).
    #[arg(long, value_name = "FILE")]
    pub assessment: PathBuf,
}

/// Execute `rgov evaluate`.
///
/// Returns exit code: 0 when the policy passes, 1 when it is violated,
/// 2 when its tree cannot be evaluated.
pub fn run_evaluate(args: &EvaluateArgs, config: &EngineConfig) -> Result<u8> {
    let policy = load_single_policy(&args.policy, config)?;
    let assessment = load_assessment(&args.assessment)?;

    match PolicyEngine::new(config).evaluate_one(&policy, &assessment) {
        Ok(outcome) => {
            print_json(&outcome)?;
            Ok(outcome_code(&outcome))
        }
        Err(e @ EngineError::Fatal { .. }) => {
            tracing::error!("{e}");
            Ok(EXIT_ERROR)
        }
    }
}

/// Execute `rgov evaluate-all`.
///
/// Returns exit code: 1 when enforcement blocks, 0 otherwise.
pub fn run_evaluate_all(args: &EvaluateAllArgs, config: &EngineConfig) -> Result<u8> {
    let assessment = load_assessment(&args.assessment)?;
    let registry = PolicyRegistry::new(config.validation_options());
    for file in collect_documents(&args.policies)? {
        for new in load_policies(&file)? {
            let name = new.name.clone();
            registry
                .create(new)
                .with_context(|| format!("{}: policy {name:?} is invalid", file.display()))?;
        }
    }

    let tenant = &assessment.geography_account_id;
    let policies = registry.active_policies(tenant)?;
    tracing::info!(
        loaded = registry.len(),
        tenant_policies = registry.list(tenant).len(),
        active = policies.len(),
        "policies selected for bulk evaluation"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.max_workers)
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let result = runtime.block_on(BulkEvaluator::new(config).evaluate_all(policies, &assessment));

    print_json(&result)?;
    Ok(bulk_code(&result))
}

fn load_single_policy(path: &Path, config: &EngineConfig) -> Result<Policy> {
    let mut policies = load_policies(path)?;
    if policies.len() != 1 {
        bail!("{} holds {} policies; expected exactly one", path.display(), policies.len());
    }
    let new = policies.remove(0);
    Policy::create(new, &config.validation_options())
        .with_context(|| format!("{}: invalid policy", path.display()))
}

fn outcome_code(outcome: &PolicyOutcome) -> u8 {
    if outcome.passed {
        EXIT_OK
    } else {
        EXIT_FINDINGS
    }
}

fn bulk_code(result: &BulkResult) -> u8 {
    if result.is_blocked() {
        EXIT_FINDINGS
    } else {
        EXIT_OK
    }
}
