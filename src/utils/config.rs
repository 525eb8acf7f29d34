//! Configuration and constants for the CLI.

/// Current output schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Function whose body is wrapped in the program timer and trace channel
pub const DEFAULT_ENTRY_FUNCTION: &str = "main";

// Event kinds written by the instrumented program
pub const KIND_LOOP_TIMER: i64 = 0;
pub const KIND_LOOP_COUNTER: i64 = 1;
pub const KIND_PROGRAM_TIMER: i64 = 2;

// Markers bracketing the whole trace stream
pub const TRACE_OPEN_MARKER: char = '[';
pub const TRACE_CLOSE_MARKER: char = ']';

/// Header the probe runtime needs in every instrumented module
pub const PROBE_RUNTIME_HEADER: &str = "loopgraph/probe.h";

pub const DEFAULT_REPORT_PATH: &str = "loop_profile.json";

/// Settings for one analysis run
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Function that receives the program timer and channel lifecycle
    pub entry_function: String,

    /// Collapse repeated (source, dest, kind) edges into one
    pub dedup_edges: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            entry_function: DEFAULT_ENTRY_FUNCTION.to_string(),
            dedup_edges: true,
        }
    }
}

impl AnalysisConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry_function(mut self, name: impl Into<String>) -> Self {
        self.entry_function = name.into();
        self
    }

    pub fn with_dedup_edges(mut self, dedup: bool) -> Self {
        self.dedup_edges = dedup;
        self
    }
}
