//! # Advisory Pipeline
//!
//! Runs the risk scorer and compliance engine over an [`AdvisoryRequest`]
//! and combines the results. Both components read only their own input, so
//! callers that source the scored parts elsewhere (an external model behind
//! a timeout) hand them to [`AdvisoryPipeline::assemble`] instead.

use arbiter_core::{AdvisoryRequest, CorrelationId};
use serde::{Deserialize, Serialize};

use crate::combiner::{ArbitrationCombiner, CombinedResponse};
use crate::compliance::{ComplianceEngine, ComplianceResponse};
use crate::risk::{RiskAdvice, RiskAssessment, RiskScorer};

/// Everything the engine produced for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisoryResponse {
    /// The request this answers.
    pub correlation_id: CorrelationId,
    /// Full risk assessment; absent on the fallback path or without risk input.
    pub risk_assessment: Option<RiskAssessment>,
    /// Risk recommendation and confidence from whichever path ran.
    pub risk: Option<RiskAdvice>,
    /// Compliance result.
    pub compliance: Option<ComplianceResponse>,
    /// The combined recommendation.
    pub combined: CombinedResponse,
    /// Whether the deterministic rules-only path produced this response.
    pub fallback_used: bool,
}

impl AdvisoryResponse {
    /// Names of the advisory components that did not run.
    pub fn missing_components(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.risk.is_none() {
            missing.push("risk");
        }
        if self.compliance.is_none() {
            missing.push("compliance");
        }
        missing
    }
}

/// Scorer, engine, and combiner wired together.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdvisoryPipeline {
    scorer: RiskScorer,
    engine: ComplianceEngine,
    combiner: ArbitrationCombiner,
}

impl AdvisoryPipeline {
    /// Create a pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// The risk scorer.
    pub fn scorer(&self) -> &RiskScorer {
        &self.scorer
    }

    /// The compliance engine.
    pub fn engine(&self) -> &ComplianceEngine {
        &self.engine
    }

    /// Scored path for every input the payload carries.
    pub fn recommend(&self, request: &AdvisoryRequest) -> AdvisoryResponse {
        let risk = request.payload.risk.as_ref().map(|i| self.scorer.assess(i));
        let compliance = request
            .payload
            .compliance
            .as_ref()
            .map(|c| self.engine.check(c));
        self.assemble(request, risk, compliance)
    }

    /// Combine scored parts produced elsewhere.
    pub fn assemble(
        &self,
        request: &AdvisoryRequest,
        risk_assessment: Option<RiskAssessment>,
        compliance: Option<ComplianceResponse>,
    ) -> AdvisoryResponse {
        let risk = risk_assessment.as_ref().map(RiskAssessment::advice);
        let combined = self
            .combiner
            .combine(risk.as_ref(), compliance.as_ref(), request.priority);
        AdvisoryResponse {
            correlation_id: request.correlation_id.clone(),
            risk_assessment,
            risk,
            compliance,
            combined,
            fallback_used: false,
        }
    }

    /// Rules-only path. Always completes synchronously.
    pub fn recommend_fallback(&self, request: &AdvisoryRequest) -> AdvisoryResponse {
        let risk = request.payload.risk.as_ref().map(|i| self.scorer.fallback(i));
        let compliance = request
            .payload
            .compliance
            .as_ref()
            .map(|c| self.engine.check_fallback(c));
        let combined =
            self.combiner
                .combine_fallback(risk.as_ref(), compliance.as_ref(), request.priority);
        AdvisoryResponse {
            correlation_id: request.correlation_id.clone(),
            risk_assessment: None,
            risk,
            compliance,
            combined,
            fallback_used: true,
        }
    }
}
