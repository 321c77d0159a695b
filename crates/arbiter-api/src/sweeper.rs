//! # SLA Sweeper
//!
//! Background task that expires overdue approval requests on a fixed
//! cadence. The first tick fires one interval after spawn.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::service::ArbiterService;

/// Spawn the sweeper. Abort the handle to stop it.
pub fn spawn_sweeper(service: Arc<ArbiterService>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let expired = service.check_expired_requests();
            tracing::debug!(expired = expired.len(), "sla sweep complete");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use arbiter_core::{
        AdvisoryPayload, AdvisoryRequest, AmountTier, ComplianceRequest, CorrelationId,
        HashedId, IdempotencyKey, Priority, RequestType, RiskInput,
    };
    use arbiter_hil::ApprovalStatus;

    fn high_value(id: &str) -> AdvisoryRequest {
        let tier = AmountTier::new(5).unwrap();
        AdvisoryRequest::new(
            CorrelationId::new(id).unwrap(),
            IdempotencyKey::new(format!("idem-{id}")).unwrap(),
            HashedId::from_raw("submitter"),
            RequestType::EscrowRelease,
            Priority::Medium,
            1_000,
            AdvisoryPayload {
                risk: Some(RiskInput::nominal(tier)),
                compliance: Some(ComplianceRequest::nominal(tier)),
                ..Default::default()
            },
        )
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_runs_on_interval() {
        let service = Arc::new(ArbiterService::local(EngineConfig::default()));
        let advice = service.advise(&high_value("sweep-1"), "tester").await.unwrap();
        assert!(advice.approval.is_some());

        let handle = spawn_sweeper(Arc::clone(&service), Duration::from_secs(1));
        tokio::time::sleep(Duration::from_millis(2_500)).await;

        // Wall-clock deadlines are minutes away; nothing expires yet.
        let id = CorrelationId::new("sweep-1").unwrap();
        assert_eq!(service.approval(&id).unwrap().status(), ApprovalStatus::Pending);
        assert!(!handle.is_finished());
        handle.abort();
    }
}
