//! Trace parsing and report schema definitions.
//!
//! This module handles:
//! - Parsing the raw trace stream of an instrumented run
//! - Validating the `(kind, tag, value)` event shape
//! - Defining the output report schema

pub mod schema;
pub mod trace;

// Re-export main types
pub use schema::{EdgeRecord, ProfileReport};
pub use trace::{count_kinds, parse_trace, EventKind, KindCounts, TraceEvent};
