//! Compile-and-execute capability for instrumented programs.
//!
//! The run is a single blocking call that returns the complete trace
//! only once the program has terminated. Any deadline on that call is
//! imposed by the caller; a timed-out run is a failed run.

pub mod command;

use crate::instrument::InstrumentationPlan;
use crate::utils::error::ExecutionError;

pub use command::{CommandExecutor, RecordedTrace};

/// Runs an instrumented program snapshot and returns its raw trace
pub trait Executor<A: ?Sized> {
    /// # Arguments
    /// * `snapshot` - Instrumented copy of the program
    /// * `plan` - Probes that were written into the snapshot
    ///
    /// # Errors
    /// Any failure means no trace; a partial stream is never returned
    fn execute(&self, snapshot: &A, plan: &InstrumentationPlan) -> Result<String, ExecutionError>;
}

impl<A, F> Executor<A> for F
where
    A: ?Sized,
    F: Fn(&A, &InstrumentationPlan) -> Result<String, ExecutionError>,
{
    fn execute(&self, snapshot: &A, plan: &InstrumentationPlan) -> Result<String, ExecutionError> {
        self(snapshot, plan)
    }
}
