//! # arbiter-advisory: Advisory Components
//!
//! The three pure stages of the advisory pipeline:
//!
//! - **Risk** ([`risk`]): weighted five-factor risk score, category, and a
//!   first-pass recommendation, plus a rules-only fallback.
//!
//! - **Compliance** ([`compliance`]): a scored strategy and a deterministic
//!   rules strategy run independently over the same request; disagreements
//!   are settled by a fixed-priority tie-breaker.
//!
//! - **Combiner** ([`combiner`]): merges whichever of the two outputs ran into
//!   one [`CombinedRecommendation`], safety first.
//!
//! [`AdvisoryPipeline`] wires the three together for callers that run
//! everything locally.
//!
//! ## Crate Policy
//!
//! Every function here is synchronous, stateless, and reads only its input
//! and the named constants next to it. Callers may run the risk scorer and
//! the compliance engine in parallel and in any order.

pub mod combiner;
pub mod compliance;
pub mod pipeline;
pub mod risk;

// Re-export primary types.
pub use combiner::{ArbitrationCombiner, CombinedRecommendation, CombinedResponse, Stance};
pub use compliance::{
    ComplianceDecision, ComplianceEngine, ComplianceRecommendation, ComplianceResponse, TieBreaker,
    TieBreakerResult,
};
pub use pipeline::{AdvisoryPipeline, AdvisoryResponse};
pub use risk::{
    EscalationTarget, RiskAdvice, RiskAssessment, RiskFactor, RiskRecommendation, RiskScorer,
};
