//! Instrumentation planning and runtime probes.
//!
//! - `plan`: where probes go and what they emit
//! - `probe`: scoped timer/counter guards that emit trace events

pub mod plan;
pub mod probe;

// Re-export main types
pub use plan::{InstrumentationPlan, Instrumenter, Placement, Probe, ProbeSite, ProbeWriter};
pub use probe::{profile_program, IterationCounter, LoopTimer, ProgramTimer, TraceChannel};
