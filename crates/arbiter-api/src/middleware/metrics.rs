//! # Request Metrics
//!
//! In-process HTTP counters kept with atomics. Engine-level figures (queue
//! state, SLA compliance) live in `HilMetrics`; these only describe traffic.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use serde::Serialize;

#[derive(Debug, Default)]
struct Counters {
    requests: AtomicU64,
    client_errors: AtomicU64,
    server_errors: AtomicU64,
    latency_micros: AtomicU64,
}

/// Shared HTTP metrics.
#[derive(Debug, Clone, Default)]
pub struct ApiMetrics {
    counters: Arc<Counters>,
}

/// Point-in-time copy of [`ApiMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ApiMetricsSnapshot {
    pub requests: u64,
    pub client_errors: u64,
    pub server_errors: u64,
    /// Mean handler latency in milliseconds; 0 before the first request.
    pub mean_latency_ms: f64,
}

impl ApiMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn observe(&self, status: axum::http::StatusCode, elapsed_micros: u64) {
        let c = &self.counters;
        c.requests.fetch_add(1, Ordering::Relaxed);
        c.latency_micros.fetch_add(elapsed_micros, Ordering::Relaxed);
        if status.is_client_error() {
            c.client_errors.fetch_add(1, Ordering::Relaxed);
        } else if status.is_server_error() {
            c.server_errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> ApiMetricsSnapshot {
        let c = &self.counters;
        let requests = c.requests.load(Ordering::Relaxed);
        let latency = c.latency_micros.load(Ordering::Relaxed);
        ApiMetricsSnapshot {
            requests,
            client_errors: c.client_errors.load(Ordering::Relaxed),
            server_errors: c.server_errors.load(Ordering::Relaxed),
            mean_latency_ms: if requests == 0 {
                0.0
            } else {
                latency as f64 / requests as f64 / 1_000.0
            },
        }
    }
}

/// Count the request and classify the response status.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let metrics = request.extensions().get::<ApiMetrics>().cloned();
    let started = Instant::now();

    let response = next.run(request).await;

    if let Some(m) = metrics {
        let micros = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        m.observe(response.status(), micros);
    }
    response
}
