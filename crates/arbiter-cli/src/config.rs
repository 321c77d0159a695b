//! # Config Subcommand
//!
//! Validate an engine configuration file, or print the effective
//! configuration.

use std::path::{Path, PathBuf};

use anyhow::Result;
use arbiter_api::config::{ConfigFile, EngineConfig};
use clap::{Args, Subcommand};

/// Arguments for `arbiter config`.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Parse and range-check a YAML configuration file.
    Check {
        /// Configuration file.
        #[arg(value_name = "CONFIG_YAML")]
        file: PathBuf,
    },
    /// Print the effective engine configuration as JSON.
    Show,
}

/// Check one file. Returns exit code 0 when valid, 1 otherwise.
pub fn check(path: &Path) -> u8 {
    match ConfigFile::load(path) {
        Ok(_) => {
            println!("OK: {}", path.display());
            0
        }
        Err(e) => {
            println!("FAIL: {}: {e}", path.display());
            1
        }
    }
}

/// Execute the config subcommand.
pub fn run_config(args: &ConfigArgs, effective: &EngineConfig) -> Result<u8> {
    match &args.command {
        ConfigCommand::Check { file } => Ok(check(file)),
        ConfigCommand::Show => {
            crate::print_json(effective)?;
            Ok(0)
        }
    }
}
