//! Output JSON schema definitions for loop profiles.
//!
//! This module defines the structure of JSON files we write to disk.
//! Schema is versioned to allow future evolution.

use crate::ast::PropertyMap;
use crate::graph::LoopGraph;
use crate::utils::config::SCHEMA_VERSION;
use serde::{Deserialize, Serialize};

/// Top-level report structure written to JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileReport {
    /// Schema version for compatibility checking
    pub version: String,

    /// Source tree the loops were discovered in
    pub program: String,

    /// Function wrapped by the program timer
    pub entry_function: String,

    /// Whole-program time in seconds (absent for static-only reports)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program_time: Option<f64>,

    /// Graph node property maps, ordered by graph index
    pub loops: Vec<PropertyMap>,

    /// Graph edges by endpoint index
    pub edges: Vec<EdgeRecord>,

    /// Timestamp when the report was generated
    pub generated_at: String,
}

/// One edge of the loop graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub source: usize,
    pub dest: usize,
    pub edge_type: String,
}

impl ProfileReport {
    /// Snapshot a loop graph into the report format
    ///
    /// **Public** - main constructor
    ///
    /// # Arguments
    /// * `graph` - Assembled loop graph
    /// * `program` - Name of the analysed source tree
    /// * `entry_function` - Function wrapped by the program timer
    /// * `program_time` - Whole-program seconds, `None` for static-only runs
    pub fn from_graph(
        graph: &LoopGraph,
        program: impl Into<String>,
        entry_function: impl Into<String>,
        program_time: Option<f64>,
    ) -> Self {
        let loops = graph.nodes().map(|(_, props)| props.clone()).collect();
        let edges = graph
            .edges()
            .map(|(source, dest, props)| EdgeRecord {
                source,
                dest,
                edge_type: props
                    .get("edge_type")
                    .and_then(|v| v.as_text())
                    .unwrap_or_default()
                    .to_string(),
            })
            .collect();

        Self {
            version: SCHEMA_VERSION.to_string(),
            program: program.into(),
            entry_function: entry_function.into(),
            program_time,
            loops,
            edges,
            generated_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Loops whose `bound_static` attribute is set
    pub fn static_bound_count(&self) -> usize {
        self.loops
            .iter()
            .filter(|props| {
                props
                    .get("bound_static")
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false)
            })
            .count()
    }

    /// Whether the report carries dynamic statistics
    pub fn is_dynamic(&self) -> bool {
        self.program_time.is_some()
    }
}
