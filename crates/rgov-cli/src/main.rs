//! # rgov CLI entry point
//!
//! Parses command-line arguments, installs logging, loads the engine
//! configuration and dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use rgov_cli::config::load_config;
use rgov_cli::evaluate::{run_evaluate, run_evaluate_all, EvaluateAllArgs, EvaluateArgs};
use rgov_cli::validate::{run_validate, ValidateArgs};
use rgov_cli::EXIT_ERROR;

/// Governance policy engine.
///
/// Validates condition trees and evaluates governance policies against risk
/// assessments, reporting violations and the enforcement decision.
#[derive(Parser, Debug)]
#[command(name = "rgov", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Engine configuration file (YAML or JSON).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate policy documents or condition trees.
    Validate(ValidateArgs),

    /// Evaluate one policy against one assessment.
    Evaluate(EvaluateArgs),

    /// Evaluate every ACTIVE policy against one assessment.
    EvaluateAll(EvaluateAllArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "rgov starting");

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{e:#}");
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let result = match cli.command {
        Commands::Validate(args) => run_validate(&args, &config),
        Commands::Evaluate(args) => run_evaluate(&args, &config),
        Commands::EvaluateAll(args) => run_evaluate_all(&args, &config),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(EXIT_ERROR)
        }
    }
}
