//! # arbiter CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use arbiter_cli::advise::{run_compliance, run_recommend, ComplianceArgs, RecommendArgs};
use arbiter_cli::config::{run_config, ConfigArgs};
use arbiter_cli::escalate::{run_escalate, EscalateArgs};

/// Arbiter engine CLI
///
/// Runs the advisory pipeline, compliance engine, and escalation gate
/// in-process over request files.
#[derive(Parser, Debug)]
#[command(name = "arbiter", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Engine configuration file (YAML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compute an advisory recommendation.
    Recommend(RecommendArgs),

    /// Run a compliance check.
    Compliance(ComplianceArgs),

    /// Preview the escalation decision for a request.
    Escalate(EscalateArgs),

    /// Check or show engine configuration.
    Config(ConfigArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    // Logs go to stderr so stdout stays parseable JSON.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = arbiter_cli::load_engine_config(cli.config.as_deref()).and_then(|config| {
        match &cli.command {
            Commands::Recommend(args) => run_recommend(args, &config),
            Commands::Compliance(args) => run_compliance(args),
            Commands::Escalate(args) => run_escalate(args, &config),
            Commands::Config(args) => run_config(args, &config),
        }
    });

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
