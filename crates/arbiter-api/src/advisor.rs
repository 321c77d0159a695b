//! # Scored Advisor
//!
//! The scored (heuristic) half of the engine sits behind [`ScoredAdvisor`]
//! so that it can be backed by something slower than a local function, such
//! as a model server. The facade races every call against the request's
//! `timeout_ms` and falls back to the rules-only path on expiry or error.
//!
//! [`LocalScoredAdvisor`] wraps the in-process scorer and scored compliance
//! strategy and never fails.

use arbiter_advisory::{ComplianceEngine, ComplianceRecommendation, RiskAssessment, RiskScorer};
use arbiter_core::{ComplianceRequest, RiskInput};
use async_trait::async_trait;
use thiserror::Error;

/// Failure of a scored backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AdvisorError {
    /// The backend could not be reached or refused the call.
    #[error("scored advisor unavailable: {0}")]
    Unavailable(String),
}

/// Source of scored risk assessments and scored compliance recommendations.
#[async_trait]
pub trait ScoredAdvisor: Send + Sync {
    /// Short name for logs and audit entries.
    fn name(&self) -> &'static str;

    /// Score a risk input.
    async fn assess_risk(&self, input: &RiskInput) -> Result<RiskAssessment, AdvisorError>;

    /// Run the scored compliance strategy.
    async fn check_compliance(
        &self,
        request: &ComplianceRequest,
    ) -> Result<ComplianceRecommendation, AdvisorError>;
}

/// In-process scored advisor.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalScoredAdvisor {
    scorer: RiskScorer,
    engine: ComplianceEngine,
}

impl LocalScoredAdvisor {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScoredAdvisor for LocalScoredAdvisor {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn assess_risk(&self, input: &RiskInput) -> Result<RiskAssessment, AdvisorError> {
        Ok(self.scorer.assess(input))
    }

    async fn check_compliance(
        &self,
        request: &ComplianceRequest,
    ) -> Result<ComplianceRecommendation, AdvisorError> {
        Ok(self.engine.scored(request))
    }
}
