//! Per-loop dynamic statistics.
//!
//! Every statistic of a loop is computed from that loop's own tag series
//! only. Tags are independent of each other, so no state is shared
//! between them.

use super::grouping::{group_events, TagSeries};
use crate::ast::{PropertyMap, PropertyValue};
use crate::parser::{parse_trace, TraceEvent};
use crate::utils::error::TraceError;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// Dynamic attributes of one loop
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoopStats {
    pub runtime_min_iter: u64,
    pub runtime_max_iter: u64,
    pub runtime_avg_iter: f64,
    pub total_dynamic_iterations: u64,
    pub dynamic_invocations: u64,
    /// Seconds spent in the loop across all invocations
    pub total_time: f64,
    pub time_per_iteration: f64,
    pub percentage_runtime: f64,
}

impl LoopStats {
    /// Statistics as graph/AST properties
    pub fn properties(&self) -> PropertyMap {
        let mut map = PropertyMap::new();
        map.insert("runtime_min_iter".into(), self.runtime_min_iter.into());
        map.insert("runtime_max_iter".into(), self.runtime_max_iter.into());
        map.insert("runtime_avg_iter".into(), PropertyValue::Float(self.runtime_avg_iter));
        map.insert(
            "total_dynamic_iterations".into(),
            self.total_dynamic_iterations.into(),
        );
        map.insert("dynamic_invocations".into(), self.dynamic_invocations.into());
        map.insert("total_time".into(), PropertyValue::Float(self.total_time));
        map.insert(
            "time_per_iteration".into(),
            PropertyValue::Float(self.time_per_iteration),
        );
        map.insert(
            "percentage_runtime".into(),
            PropertyValue::Float(self.percentage_runtime),
        );
        map
    }
}

/// Aggregated view of one complete run
#[derive(Debug, Clone, Default)]
pub struct ProfileSummary {
    series: TagSeries,
}

impl ProfileSummary {
    /// Aggregate already-parsed events
    ///
    /// **Public** - main entry point for aggregation
    pub fn from_events(events: &[TraceEvent]) -> Self {
        Self {
            series: group_events(events),
        }
    }

    /// Total program time in seconds
    pub fn program_time(&self) -> f64 {
        self.series.program_time
    }

    /// Tags that recorded at least one counter event, sorted
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.series.counters.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    /// Statistics for one loop tag
    ///
    /// A tag that never appeared yields all-zero iteration statistics.
    pub fn stats_for(&self, tag: &str) -> LoopStats {
        let mut stats = match self.series.counters.get(tag) {
            Some(counts) if !counts.is_empty() => iteration_stats(counts),
            _ => {
                debug!("Tag '{}' absent from trace; zero-filling", tag);
                LoopStats::default()
            }
        };

        stats.total_time = self
            .series
            .timers
            .get(tag)
            .map(|times| times.iter().sum())
            .unwrap_or(0.0);

        stats.time_per_iteration = if stats.total_dynamic_iterations > 0 {
            stats.total_time / stats.total_dynamic_iterations as f64
        } else {
            0.0
        };

        stats.percentage_runtime = if self.series.program_time > 0.0 {
            100.0 * stats.total_time / self.series.program_time
        } else {
            0.0
        };

        stats
    }
}

fn iteration_stats(counts: &[u64]) -> LoopStats {
    let invocations = counts.len() as u64;
    let total = counts
        .iter()
        .try_fold(0u64, |acc, &c| acc.checked_add(c))
        .unwrap_or_else(|| {
            warn!("Iteration total overflows u64 over {} invocations; saturating", invocations);
            u64::MAX
        });

    LoopStats {
        runtime_min_iter: counts.iter().copied().min().unwrap_or(0),
        runtime_max_iter: counts.iter().copied().max().unwrap_or(0),
        runtime_avg_iter: counts.iter().map(|&c| c as f64).sum::<f64>() / invocations as f64,
        total_dynamic_iterations: total,
        dynamic_invocations: invocations,
        ..LoopStats::default()
    }
}

/// Aggregate parsed events
pub fn aggregate(events: &[TraceEvent]) -> ProfileSummary {
    ProfileSummary::from_events(events)
}

/// Parse and aggregate a raw trace
///
/// # Errors
/// * `TraceError` - the trace is malformed; no partial summary is produced
pub fn aggregate_trace(raw: &str) -> Result<ProfileSummary, TraceError> {
    let events = parse_trace(raw)?;
    Ok(aggregate(&events))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_are_scoped_per_tag() {
        let summary = aggregate(&[
            TraceEvent::loop_counter("A", 100),
            TraceEvent::loop_counter("B", 1),
            TraceEvent::loop_counter("B", 3),
            TraceEvent::program_timer(1.0),
        ]);

        let b = summary.stats_for("B");
        assert_eq!(b.runtime_min_iter, 1);
        assert_eq!(b.runtime_max_iter, 3);
        assert_eq!(b.runtime_avg_iter, 2.0);
        assert_eq!(b.dynamic_invocations, 2);
    }

    #[test]
    fn test_iteration_total_saturates() {
        let summary = aggregate(&[
            TraceEvent::loop_counter("A", u64::MAX),
            TraceEvent::loop_counter("A", 1),
            TraceEvent::loop_timer("A", 2.0),
        ]);
        let a = summary.stats_for("A");

        assert_eq!(a.total_dynamic_iterations, u64::MAX);
        assert_eq!(a.runtime_min_iter, 1);
        assert_eq!(a.runtime_max_iter, u64::MAX);
        assert!(a.runtime_avg_iter > 9.0e18);
        assert!(a.time_per_iteration > 0.0);
    }

    #[test]
    fn test_absent_tag_is_zero() {
        let summary = aggregate(&[TraceEvent::program_timer(1.0)]);
        assert_eq!(summary.stats_for("missing"), LoopStats::default());
    }

    #[test]
    fn test_zero_divisors() {
        let summary = aggregate(&[
            TraceEvent::loop_counter("A", 0),
            TraceEvent::loop_timer("A", 0.5),
        ]);
        let a = summary.stats_for("A");

        assert_eq!(a.dynamic_invocations, 1);
        assert_eq!(a.total_time, 0.5);
        assert_eq!(a.time_per_iteration, 0.0);
        assert_eq!(a.percentage_runtime, 0.0);
    }

    #[test]
    fn test_aggregate_trace_rejects_malformed() {
        assert!(aggregate_trace("[(1, 'A', 5), (1, 'A'").is_err());
    }

    #[test]
    fn test_tags_sorted() {
        let summary = aggregate(&[
            TraceEvent::loop_counter("b", 1),
            TraceEvent::loop_counter("a", 1),
        ]);
        assert_eq!(summary.tags(), vec!["a", "b"]);
    }
}
