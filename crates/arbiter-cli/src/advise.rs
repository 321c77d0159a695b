//! # Recommend and Compliance Subcommands
//!
//! Run the advisory pipeline or the compliance engine over one input file.
//! Requests are validated against the configured timeout ceiling first.

use std::path::PathBuf;

use anyhow::{Context, Result};
use arbiter_advisory::{AdvisoryPipeline, AdvisoryResponse, ComplianceResponse};
use arbiter_api::config::EngineConfig;
use arbiter_core::{AdvisoryRequest, ComplianceRequest};
use clap::Args;

/// Arguments for `arbiter recommend`.
#[derive(Args, Debug)]
pub struct RecommendArgs {
    /// Advisory request file (JSON or YAML).
    #[arg(value_name = "REQUEST")]
    pub file: PathBuf,

    /// Use the deterministic rules-only path.
    #[arg(long)]
    pub fallback: bool,
}

/// Arguments for `arbiter compliance`.
#[derive(Args, Debug)]
pub struct ComplianceArgs {
    /// Compliance request file (JSON or YAML).
    #[arg(value_name = "REQUEST")]
    pub file: PathBuf,

    /// Use the rules strategy only.
    #[arg(long)]
    pub fallback: bool,
}

/// Read, validate, and answer an advisory request.
pub fn recommend(args: &RecommendArgs, config: &EngineConfig) -> Result<AdvisoryResponse> {
    let request: AdvisoryRequest = crate::read_input(&args.file)?;
    request
        .validate(config.max_timeout_ms)
        .with_context(|| format!("invalid advisory request: {}", args.file.display()))?;

    let pipeline = AdvisoryPipeline::new();
    let response = if args.fallback {
        pipeline.recommend_fallback(&request)
    } else {
        pipeline.recommend(&request)
    };
    tracing::info!(
        correlation_id = %request.correlation_id.as_str(),
        recommendation = response.combined.recommendation.kind(),
        fallback = response.fallback_used,
        "recommendation computed"
    );
    Ok(response)
}

/// Execute the recommend subcommand.
pub fn run_recommend(args: &RecommendArgs, config: &EngineConfig) -> Result<u8> {
    crate::print_json(&recommend(args, config)?)?;
    Ok(0)
}

/// Read, validate, and check a compliance request.
pub fn compliance(args: &ComplianceArgs) -> Result<ComplianceResponse> {
    let request: ComplianceRequest = crate::read_input(&args.file)?;
    request
        .validate()
        .with_context(|| format!("invalid compliance request: {}", args.file.display()))?;

    let pipeline = AdvisoryPipeline::new();
    let engine = pipeline.engine();
    Ok(if args.fallback {
        engine.check_fallback(&request)
    } else {
        engine.check(&request)
    })
}

/// Execute the compliance subcommand.
pub fn run_compliance(args: &ComplianceArgs) -> Result<u8> {
    crate::print_json(&compliance(args)?)?;
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbiter_advisory::{CombinedRecommendation, ComplianceDecision};
    use std::io::Write;

    fn input(text: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{text}").unwrap();
        file
    }

    const REQUEST: &str = r#"{
        "correlation_id": "cli-1",
        "idempotency_key": "idem-cli-1",
        "submitter_id": "0000000000000000000000000000000000000000000000000000000000000000",
        "request_type": "payment_clearance",
        "timeout_ms": 1000,
        "payload": {
            "risk": { "amount_tier": 1 },
            "compliance": {
                "sanctions": "clear",
                "risk_profile": "low",
                "verification": "standard",
                "amount_tier": 1
            }
        }
    }"#;

    #[test]
    fn recommend_nominal_request() {
        let file = input(REQUEST);
        let args = RecommendArgs {
            file: file.path().to_path_buf(),
            fallback: false,
        };
        let response = recommend(&args, &EngineConfig::default()).unwrap();
        assert!(!response.fallback_used);
        assert!(matches!(
            response.combined.recommendation,
            CombinedRecommendation::Proceed { .. }
        ));
    }

    #[test]
    fn recommend_fallback_flag() {
        let file = input(REQUEST);
        let args = RecommendArgs {
            file: file.path().to_path_buf(),
            fallback: true,
        };
        let response = recommend(&args, &EngineConfig::default()).unwrap();
        assert!(response.fallback_used);
        assert!(response.risk_assessment.is_none());
    }

    #[test]
    fn timeout_above_configured_ceiling_rejected() {
        let file = input(REQUEST);
        let args = RecommendArgs {
            file: file.path().to_path_buf(),
            fallback: false,
        };
        let config = EngineConfig {
            max_timeout_ms: 500,
            ..EngineConfig::default()
        };
        let err = recommend(&args, &config).unwrap_err();
        assert!(format!("{err:#}").contains("invalid timeout"));
    }

    #[test]
    fn yaml_compliance_request() {
        let file = input(
            "sanctions: blocked\nrisk_profile: low\nverification: standard\namount_tier: 2\n",
        );
        let args = ComplianceArgs {
            file: file.path().to_path_buf(),
            fallback: true,
        };
        let response = compliance(&args).unwrap();
        assert_eq!(response.recommendation.decision(), ComplianceDecision::Reject);
        assert!(response.fallback_used);
    }

    #[test]
    fn malformed_input_names_file() {
        let file = input("{ not valid");
        let args = ComplianceArgs {
            file: file.path().to_path_buf(),
            fallback: false,
        };
        let err = compliance(&args).unwrap_err();
        assert!(format!("{err:#}").contains("failed to parse input file"));
    }
}
