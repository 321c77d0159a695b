//! # API Route Modules
//!
//! - `advisory`: recommendations, with automatic escalation to the approval
//!   queue when the gate requires a human.
//! - `compliance`: standalone compliance checks.
//! - `hil`: review requests, resolution, SLA sweeps, HIL metrics.
//! - `audit`: per-correlation audit trails.
//! - `ops`: HTTP traffic counters.

pub mod advisory;
pub mod audit;
pub mod compliance;
pub mod hil;
pub mod ops;
