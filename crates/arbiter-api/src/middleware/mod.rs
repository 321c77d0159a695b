//! # Middleware
//!
//! - `metrics`: request, rejection, and latency counters.

pub mod metrics;
