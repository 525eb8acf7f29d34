use crate::utils::config::{AnalysisConfig, DEFAULT_ENTRY_FUNCTION, DEFAULT_REPORT_PATH};
use std::path::PathBuf;

/// Arguments for the profile command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct ProfileArgs {
    /// JSON source tree of the program
    pub source: PathBuf,

    /// Build-and-run command for the instrumented program (program + args)
    pub command: Vec<String>,

    /// Trace file: written by `command`, or a recorded trace when no command is given
    pub trace_file: Option<PathBuf>,

    /// Where the probe plan is written for the build step (optional)
    pub plan_file: Option<PathBuf>,

    /// Output path for JSON report
    pub output_json: PathBuf,

    /// Output path for DOT graph (optional)
    pub output_dot: Option<PathBuf>,

    /// Function wrapped by the program timer
    pub entry_function: String,

    /// Keep repeated (source, dest, kind) edges
    pub keep_duplicate_edges: bool,

    /// Print per-loop summary to stdout
    pub print_summary: bool,
}

impl Default for ProfileArgs {
    fn default() -> Self {
        Self {
            source: PathBuf::new(),
            command: Vec::new(),
            trace_file: None,
            plan_file: None,
            output_json: PathBuf::from(DEFAULT_REPORT_PATH),
            output_dot: None,
            entry_function: DEFAULT_ENTRY_FUNCTION.to_string(),
            keep_duplicate_edges: false,
            print_summary: false,
        }
    }
}

/// Arguments for the static-only analyze command
#[derive(Debug, Clone)]
pub struct AnalyzeArgs {
    pub source: PathBuf,
    pub output_json: Option<PathBuf>,
    pub output_dot: Option<PathBuf>,
    pub entry_function: String,
    pub keep_duplicate_edges: bool,

    /// Print every non-empty property map
    pub dump: bool,

    /// Print the probe plan
    pub show_plan: bool,
}

impl Default for AnalyzeArgs {
    fn default() -> Self {
        Self {
            source: PathBuf::new(),
            output_json: None,
            output_dot: None,
            entry_function: DEFAULT_ENTRY_FUNCTION.to_string(),
            keep_duplicate_edges: false,
            dump: false,
            show_plan: false,
        }
    }
}

pub(crate) fn analysis_config(entry_function: &str, keep_duplicate_edges: bool) -> AnalysisConfig {
    AnalysisConfig::new()
        .with_entry_function(entry_function)
        .with_dedup_edges(!keep_duplicate_edges)
}

/// Name recorded in reports for a source tree path
pub(crate) fn program_name(source: &std::path::Path) -> String {
    source
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| source.display().to_string())
}
