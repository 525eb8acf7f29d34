//! Output writers for reports and loop graphs.
//!
//! This module handles writing data to disk in various formats:
//! - JSON reports and property dumps
//! - Graphviz DOT graphs

pub mod dot;
pub mod json;

// Re-export main functions
pub use dot::{render_dot, write_dot};
pub use json::{dump_properties, properties_to_string, read_report, write_report};
