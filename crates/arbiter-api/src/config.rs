//! # Configuration
//!
//! Process settings come from environment variables. Engine tuning comes
//! from an optional YAML file named by `ARBITER_CONFIG`:
//!
//! ```yaml
//! engine:
//!   escalation:
//!     low_confidence: 0.6
//!   sla:
//!     critical_minutes: 15
//!   max_timeout_ms: 30000
//! ```
//!
//! Every field has a default, so a partial file (or no file) is valid.

use std::path::{Path, PathBuf};

use arbiter_core::DEFAULT_MAX_TIMEOUT_MS;
use arbiter_hil::{EscalationThresholds, SlaPolicy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default SLA sweep interval.
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 30;

/// Default scoring budget for requests that arrive without their own.
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;

/// Default idempotency cache bound.
pub const DEFAULT_IDEMPOTENCY_CAPACITY: usize = 10_000;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid YAML for [`ConfigFile`].
    #[error("cannot parse config file {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// An environment variable holds an unusable value.
    #[error("invalid value for {var}: \"{value}\"")]
    InvalidEnv { var: &'static str, value: String },

    /// A value parsed but is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// ---------------------------------------------------------------------------
// Engine configuration
// ---------------------------------------------------------------------------

/// Tuning for the engine facade and escalation gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Escalation trigger thresholds.
    pub escalation: EscalationThresholds,
    /// SLA minutes and business-impact multipliers.
    pub sla: SlaPolicy,
    /// Largest `timeout_ms` a request may ask for.
    pub max_timeout_ms: u64,
    /// Scoring budget for compliance checks, which carry no timeout.
    pub default_timeout_ms: u64,
    /// Idempotency cache bound.
    pub idempotency_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            escalation: EscalationThresholds::default(),
            sla: SlaPolicy::default(),
            max_timeout_ms: DEFAULT_MAX_TIMEOUT_MS,
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
            idempotency_capacity: DEFAULT_IDEMPOTENCY_CAPACITY,
        }
    }
}

impl EngineConfig {
    /// Range checks across every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.escalation
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.sla
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if self.max_timeout_ms == 0 {
            return Err(ConfigError::Invalid("max_timeout_ms must be positive".into()));
        }
        if self.default_timeout_ms == 0 || self.default_timeout_ms > self.max_timeout_ms {
            return Err(ConfigError::Invalid(format!(
                "default_timeout_ms must be within 1-{}",
                self.max_timeout_ms
            )));
        }
        if self.idempotency_capacity == 0 {
            return Err(ConfigError::Invalid(
                "idempotency_capacity must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Shape of the YAML file named by `ARBITER_CONFIG`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub engine: EngineConfig,
}

impl ConfigFile {
    /// Parse YAML text and validate it.
    pub fn from_yaml(text: &str, path: &Path) -> Result<Self, ConfigError> {
        let file: Self = serde_yaml::from_str(text).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })?;
        file.engine.validate()?;
        Ok(file)
    }

    /// Read, parse, and validate a file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&text, path)
    }
}

// ---------------------------------------------------------------------------
// Application configuration
// ---------------------------------------------------------------------------

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.to_ascii_lowercase().as_str() {
            "" | "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::InvalidEnv {
                var: "LOG_FORMAT",
                value: value.to_string(),
            }),
        }
    }
}

/// Application configuration.
///
/// Custom `Debug` redacts the `auth_token` to prevent credential leakage in logs.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Shared secret for bearer tokens. `None` disables authentication.
    pub auth_token: Option<String>,
    /// Seconds between SLA sweeps.
    pub sweep_interval_secs: u64,
    /// Log output format.
    pub log_format: LogFormat,
    /// Engine tuning.
    pub engine: EngineConfig,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field(
                "auth_token",
                &self.auth_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("sweep_interval_secs", &self.sweep_interval_secs)
            .field("log_format", &self.log_format)
            .field("engine", &self.engine)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            auth_token: None,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
            log_format: LogFormat::Text,
            engine: EngineConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(port) = lookup("PORT") {
            config.port = port.parse().map_err(|_| ConfigError::InvalidEnv {
                var: "PORT",
                value: port.clone(),
            })?;
        }
        config.auth_token = lookup("AUTH_TOKEN").filter(|t| !t.is_empty());
        if let Some(secs) = lookup("SWEEP_INTERVAL_SECS") {
            config.sweep_interval_secs = match secs.parse() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::InvalidEnv {
                        var: "SWEEP_INTERVAL_SECS",
                        value: secs,
                    })
                }
            };
        }
        if let Some(format) = lookup("LOG_FORMAT") {
            config.log_format = LogFormat::parse(&format)?;
        }
        if let Some(path) = lookup("ARBITER_CONFIG").filter(|p| !p.is_empty()) {
            config.engine = ConfigFile::load(Path::new(&path))?.engine;
        }

        Ok(config)
    }
}
