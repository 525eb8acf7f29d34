//! Aggregation of trace events into per-loop statistics.
//!
//! This module transforms a parsed trace into:
//! - Per-tag counter and timer series
//! - Iteration statistics (min/max/avg, invocations)
//! - Timing statistics (total, per iteration, share of program time)

pub mod grouping;
pub mod metrics;

// Re-export main types and functions
pub use grouping::{group_events, TagSeries};
pub use metrics::{aggregate, aggregate_trace, LoopStats, ProfileSummary};
