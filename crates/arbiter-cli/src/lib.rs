//! # arbiter-cli: Offline Tooling for the Arbiter Engine
//!
//! Runs the deterministic in-process engine against request files, without
//! a server. Inputs are JSON or YAML; output is pretty-printed JSON on
//! stdout.
//!
//! ## Subcommands
//!
//! - `arbiter recommend <FILE> [--fallback]`: advisory recommendation.
//! - `arbiter compliance <FILE> [--fallback]`: compliance check.
//! - `arbiter escalate <FILE>`: recommendation plus escalation decision.
//! - `arbiter config check <FILE>` / `arbiter config show`: configuration.
//!
//! ```bash
//! arbiter --config arbiter.yaml escalate release-42.json
//! ```

pub mod advise;
pub mod config;
pub mod escalate;

use std::path::Path;

use anyhow::{Context, Result};
use arbiter_api::config::{ConfigFile, EngineConfig};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Engine configuration from `path`, or the defaults.
pub fn load_engine_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => {
            let file = ConfigFile::load(path)
                .with_context(|| format!("failed to load config: {}", path.display()))?;
            tracing::debug!(path = %path.display(), "loaded engine configuration");
            Ok(file.engine)
        }
        None => Ok(EngineConfig::default()),
    }
}

/// Read and parse an input file. YAML is a superset of JSON, so both parse.
pub fn read_input<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read input file: {}", path.display()))?;
    serde_yaml::from_str(&text)
        .with_context(|| format!("failed to parse input file: {}", path.display()))
}

/// Pretty-print a value as JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{text}");
    Ok(())
}
