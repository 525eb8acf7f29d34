//! CLI command implementations.
//!
//! Each command is implemented in its own module.
//! Commands orchestrate the various library components to perform user tasks.

pub mod analyze;
pub mod models;
pub mod profile;
pub mod utils;

// Re-export main command functions
pub use analyze::execute_analyze;
pub use models::{AnalyzeArgs, ProfileArgs};
pub use profile::{execute_profile, validate_args};
pub use utils::{display_schema, display_version, validate_report_file, validate_trace_file};
