//! # Input Files
//!
//! Loading of policy and assessment documents. Every file is read through
//! `serde_yaml`, which also accepts JSON.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use rgov_agentic::Assessment;
use rgov_state::NewPolicy;
use serde::de::DeserializeOwned;

const DOCUMENT_EXTENSIONS: &[&str] = &["yaml", "yml", "json"];

/// Read and parse one YAML or JSON document.
pub fn read_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_yaml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}

/// Policies in `path`: either a single policy document or a sequence.
pub fn load_policies(path: &Path) -> Result<Vec<NewPolicy>> {
    let doc: serde_json::Value = read_document(path)?;
    let policies = match doc {
        serde_json::Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| {
                serde_json::from_value(item)
                    .with_context(|| format!("{}: policy #{i} is malformed", path.display()))
            })
            .collect::<Result<Vec<NewPolicy>>>()?,
        other => vec![serde_json::from_value(other)
            .with_context(|| format!("{}: malformed policy document", path.display()))?],
    };
    Ok(policies)
}

pub fn load_assessment(path: &Path) -> Result<Assessment> {
    read_document(path)
}

/// Expand directories into their YAML/JSON files, sorted by name.
///
/// Directories are not searched recursively.
pub fn collect_documents(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut found: Vec<PathBuf> = std::fs::read_dir(path)
                .with_context(|| format!("failed to list {}", path.display()))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && is_document(p))
                .collect();
            found.sort();
            files.extend(found);
        } else if path.is_file() {
            files.push(path.clone());
        } else {
            bail!("{} does not exist", path.display());
        }
    }
    Ok(files)
}

fn is_document(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| DOCUMENT_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}
