//! # Validate Subcommand
//!
//! Checks policy documents and bare condition trees before they are ever
//! evaluated. A document with a `conditions` member is a policy; anything
//! else is treated as a condition tree on its own. Every problem is
//! reported, not just the first.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use rgov_agentic::EngineConfig;
use rgov_logic::{validate_condition_tree_with, RawCondition, ValidationIssue, ValidationOptions};
use rgov_state::{NewPolicy, Policy};
use serde::Serialize;

use crate::input::{collect_documents, read_document};
use crate::{print_json, EXIT_FINDINGS, EXIT_OK};

/// Arguments for the `rgov validate` subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Policy or condition tree files, or directories of them.
    #[arg(value_name = "POLICY", required = true)]
    pub paths: Vec<PathBuf>,

    /// Print the reports as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Validation outcome for one file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReport {
    pub file: PathBuf,
    pub valid: bool,
    /// Condition tree problems, with paths relative to the document root.
    pub errors: Vec<ValidationIssue>,
    /// Problems with the rest of a policy document.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub policy_errors: Vec<String>,
}

/// Execute the validate subcommand.
///
/// Returns exit code: 0 when every file is valid, 1 otherwise.
pub fn run_validate(args: &ValidateArgs, config: &EngineConfig) -> Result<u8> {
    let options = config.validation_options();
    let files = collect_documents(&args.paths)?;
    let mut reports = Vec::with_capacity(files.len());
    for file in files {
        let doc: serde_json::Value = read_document(&file)?;
        reports.push(validate_document(file, doc, &options));
    }

    if args.json {
        print_json(&reports)?;
    } else {
        for report in &reports {
            print_report(report);
        }
    }

    let failed = reports.iter().filter(|r| !r.valid).count();
    tracing::info!(files = reports.len(), failed, "validation finished");
    Ok(if failed == 0 { EXIT_OK } else { EXIT_FINDINGS })
}

/// Validate one parsed document.
pub fn validate_document(
    file: PathBuf,
    doc: serde_json::Value,
    options: &ValidationOptions,
) -> FileReport {
    let is_policy = doc.get("conditions").is_some() && doc.get("operator").is_none();
    let tree = if is_policy {
        doc.get("conditions").cloned().unwrap_or_default()
    } else {
        doc.clone()
    };
    let prefix = if is_policy { "/conditions" } else { "" };

    let mut errors = Vec::new();
    let mut policy_errors = Vec::new();
    match serde_json::from_value::<RawCondition>(tree) {
        Ok(raw) => {
            let result = validate_condition_tree_with(&raw, options);
            errors = result
                .errors
                .into_iter()
                .map(|issue| ValidationIssue {
                    path: rebase(prefix, &issue.path),
                    ..issue
                })
                .collect();
        }
        Err(e) => {
            policy_errors.push(format!("{}: malformed condition tree: {e}", rebase(prefix, "/")))
        }
    }

    if is_policy && errors.is_empty() && policy_errors.is_empty() {
        match serde_json::from_value::<NewPolicy>(doc) {
            Ok(new) => {
                if let Err(e) = Policy::create(new, options) {
                    policy_errors.push(e.to_string());
                }
            }
            Err(e) => policy_errors.push(format!("malformed policy document: {e}")),
        }
    }

    FileReport {
        file,
        valid: errors.is_empty() && policy_errors.is_empty(),
        errors,
        policy_errors,
    }
}

fn rebase(prefix: &str, path: &str) -> String {
    match (prefix, path) {
        ("", p) => p.to_string(),
        (pre, "/") => pre.to_string(),
        (pre, p) => format!("{pre}{p}"),
    }
}

fn print_report(report: &FileReport) {
    if report.valid {
        println!("OK:   {}", report.file.display());
        return;
    }
    println!("FAIL: {}", report.file.display());
    for issue in &report.errors {
        println!("  {}: {}", issue.path, issue.message);
    }
    for problem in &report.policy_errors {
        println!("  {problem}");
    }
}
