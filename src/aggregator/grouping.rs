//! Group trace events into per-tag series.
//!
//! Counter and timer events are partitioned by kind, then grouped by loop
//! tag into ordered sequences (one entry per loop invocation). The
//! program timer is kept aside as the run's total time.

use crate::parser::{EventKind, TraceEvent};
use log::{debug, warn};
use std::collections::HashMap;

/// Per-tag event series from one complete run
#[derive(Debug, Clone, Default)]
pub struct TagSeries {
    /// tag -> iteration count of each invocation, in emission order
    pub counters: HashMap<String, Vec<u64>>,

    /// tag -> elapsed seconds of each invocation, in emission order
    pub timers: HashMap<String, Vec<f64>>,

    /// Total program time in seconds (0 if no program timer was seen)
    pub program_time: f64,
}

/// Build per-tag series from a parsed trace
///
/// **Public** - first stage of aggregation
///
/// # Algorithm
/// 1. Partition events by kind
/// 2. Append kind-1 values to their tag's counter series
/// 3. Append kind-0 values to their tag's timer series
/// 4. Take the kind-2 value as program time
pub fn group_events(events: &[TraceEvent]) -> TagSeries {
    let mut series = TagSeries::default();
    let mut program_timers = 0usize;

    for event in events {
        match (event.kind, event.tag.as_deref()) {
            (EventKind::LoopCounter, Some(tag)) => series
                .counters
                .entry(tag.to_string())
                .or_default()
                .push(event.count),
            (EventKind::LoopTimer, Some(tag)) => series
                .timers
                .entry(tag.to_string())
                .or_default()
                .push(event.value),
            (EventKind::ProgramTimer, _) => {
                program_timers += 1;
                series.program_time += event.value;
            }
            (kind, None) => warn!("Dropping untagged {:?} event", kind),
        }
    }

    if program_timers > 1 {
        warn!(
            "Trace holds {} program timer events; summing them",
            program_timers
        );
    } else if program_timers == 0 {
        warn!("Trace holds no program timer event; runtime percentages will be 0");
    }

    debug!(
        "Grouped events into {} counter tags and {} timer tags",
        series.counters.len(),
        series.timers.len()
    );

    series
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_keeps_order_per_tag() {
        let events = vec![
            TraceEvent::loop_counter("A", 5),
            TraceEvent::loop_counter("B", 1),
            TraceEvent::loop_counter("A", 7),
            TraceEvent::loop_timer("A", 0.5),
            TraceEvent::program_timer(3.0),
        ];

        let series = group_events(&events);

        assert_eq!(series.counters["A"], vec![5, 7]);
        assert_eq!(series.counters["B"], vec![1]);
        assert_eq!(series.timers["A"], vec![0.5]);
        assert!(!series.timers.contains_key("B"));
        assert_eq!(series.program_time, 3.0);
    }

    #[test]
    fn test_missing_program_timer() {
        let series = group_events(&[TraceEvent::loop_counter("A", 1)]);
        assert_eq!(series.program_time, 0.0);
    }
}
