//! # Configuration Loading
//!
//! Engine limits come from, in increasing precedence: built-in defaults,
//! the `--config` file (YAML or JSON), then `RGOV_*` environment variables.

use std::path::Path;

use anyhow::{Context, Result};
use rgov_agentic::EngineConfig;

pub fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    load_config_with(path, |var| std::env::var(var).ok())
}

/// [`load_config`] with an explicit environment lookup.
pub fn load_config_with(
    path: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<EngineConfig> {
    let base = match path {
        Some(path) => crate::input::read_document::<EngineConfig>(path)
            .with_context(|| format!("invalid engine configuration in {}", path.display()))?,
        None => EngineConfig::default(),
    };
    let config = base
        .with_overrides(env)
        .context("invalid engine configuration")?;
    tracing::debug!(?config, "engine configuration loaded");
    Ok(config)
}
