//! # Escalate Subcommand
//!
//! Previews what the escalation gate would do with a request: the
//! recommendation is computed in-process and evaluated against the
//! configured thresholds and SLA policy. Nothing is queued.

use std::path::PathBuf;

use anyhow::{Context, Result};
use arbiter_advisory::{AdvisoryPipeline, AdvisoryResponse};
use arbiter_api::config::EngineConfig;
use arbiter_core::AdvisoryRequest;
use arbiter_hil::{EscalationDecision, EscalationGate};
use chrono::Utc;
use clap::Args;
use serde::Serialize;

/// Arguments for `arbiter escalate`.
#[derive(Args, Debug)]
pub struct EscalateArgs {
    /// Advisory request file (JSON or YAML).
    #[arg(value_name = "REQUEST")]
    pub file: PathBuf,

    /// Exit with status 3 when a human must decide.
    #[arg(long)]
    pub check: bool,
}

/// Recommendation and gate decision for one request.
#[derive(Debug, Serialize)]
pub struct EscalationPreview {
    pub advisory: AdvisoryResponse,
    pub decision: EscalationDecision,
}

/// Exit status for `--check` when review is required.
pub const EXIT_REQUIRES_APPROVAL: u8 = 3;

/// Compute the preview.
pub fn escalate(args: &EscalateArgs, config: &EngineConfig) -> Result<EscalationPreview> {
    let request: AdvisoryRequest = crate::read_input(&args.file)?;
    request
        .validate(config.max_timeout_ms)
        .with_context(|| format!("invalid advisory request: {}", args.file.display()))?;

    let advisory = AdvisoryPipeline::new().recommend(&request);
    let gate = EscalationGate::new(config.escalation, config.sla);
    let decision = gate.evaluate(&request, &advisory, Utc::now());
    Ok(EscalationPreview { advisory, decision })
}

/// Execute the escalate subcommand.
pub fn run_escalate(args: &EscalateArgs, config: &EngineConfig) -> Result<u8> {
    let preview = escalate(args, config)?;
    crate::print_json(&preview)?;
    let needs_human = matches!(preview.decision, EscalationDecision::RequiresApproval(_));
    Ok(if args.check && needs_human {
        EXIT_REQUIRES_APPROVAL
    } else {
        0
    })
}
