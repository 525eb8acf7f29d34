//! Error types for the entire application.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.

use crate::ast::NodeId;
use thiserror::Error;

/// Errors raised by the program-structure adapter
#[derive(Error, Debug)]
pub enum AstError {
    #[error("Source tree deserialization failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Failed to read source tree: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    #[error("Loop {0} has no condition clause")]
    MissingCondition(NodeId),

    #[error("Condition of loop {0} has no bound operand")]
    MissingBoundOperand(NodeId),

    #[error("Invalid source tree: {0}")]
    InvalidTree(String),
}

/// Errors that can occur during trace parsing
///
/// Any of these aborts aggregation for the whole run.
#[derive(Error, Debug, PartialEq)]
pub enum TraceError {
    #[error("Trace is empty")]
    Empty,

    #[error("Missing opening '[' marker")]
    MissingOpenMarker,

    #[error("Trace truncated at offset {0}")]
    Truncated(usize),

    #[error("Unexpected character '{found}' at offset {offset}")]
    UnexpectedChar { found: char, offset: usize },

    #[error("Invalid number '{text}' at offset {offset}")]
    InvalidNumber { text: String, offset: usize },

    #[error("Unknown event kind {kind} at offset {offset}")]
    UnknownKind { kind: i64, offset: usize },

    #[error("Event at offset {offset} has {found} fields, expected {expected}")]
    WrongArity {
        offset: usize,
        found: usize,
        expected: usize,
    },

    #[error("Loop event at offset {0} carries no tag")]
    MissingTag(usize),
}

/// Errors that can occur while writing probes into a program snapshot
#[derive(Error, Debug)]
pub enum InstrumentError {
    #[error("Probe target {0} does not exist in the snapshot")]
    UnknownTarget(NodeId),

    #[error("Probe rejected: {0}")]
    Rejected(String),
}

/// Errors that can occur while compiling and running the instrumented program
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Failed to spawn '{command}': {source}")]
    SpawnFailed {
        command: String,
        source: std::io::Error,
    },

    #[error("Program exited with status {0}")]
    NonZeroExit(i32),

    #[error("Program terminated by signal")]
    Terminated,

    #[error("No trace output produced")]
    NoTrace,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Errors that can occur during file output
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write file: {0}")]
    WriteFailed(#[from] std::io::Error),

    #[error("Failed to serialize JSON: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("Invalid output path: {0}")]
    InvalidPath(String),
}

/// Errors that abort a profiling run after static analysis
#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("Instrumentation failed: {0}")]
    Instrument(#[from] InstrumentError),

    #[error("Execution failed: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Malformed trace: {0}")]
    Trace(#[from] TraceError),

    #[error("Runtime statistics were already applied to this program")]
    AlreadyProfiled,
}
