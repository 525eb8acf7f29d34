//! Process-backed executors.

use super::Executor;
use crate::instrument::InstrumentationPlan;
use crate::utils::error::ExecutionError;
use log::{debug, info};
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Environment variable pointing the build step at the probe plan
pub const PLAN_ENV_VAR: &str = "LOOPGRAPH_PLAN";

/// Runs an external build-and-run command
///
/// The command receives the probe plan (as JSON, via [`PLAN_ENV_VAR`])
/// when a plan file is configured. The trace is read from `trace_file`
/// if set, otherwise from the command's stdout.
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    program: String,
    args: Vec<String>,
    trace_file: Option<PathBuf>,
    plan_file: Option<PathBuf>,
    working_dir: Option<PathBuf>,
}

impl CommandExecutor {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            trace_file: None,
            plan_file: None,
            working_dir: None,
        }
    }

    /// Build from `[program, args...]`
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(program.clone()).with_args(args.iter().cloned()))
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = String>) -> Self {
        self.args.extend(args);
        self
    }

    pub fn with_trace_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.trace_file = Some(path.into());
        self
    }

    pub fn with_plan_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.plan_file = Some(path.into());
        self
    }

    pub fn with_working_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(path.into());
        self
    }

    fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// **Private** - serialize the plan for the build step
    fn write_plan(path: &Path, plan: &InstrumentationPlan) -> Result<(), ExecutionError> {
        debug!("Writing probe plan to: {}", path.display());
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, plan).map_err(io::Error::from)?;
        Ok(())
    }
}

impl<A: ?Sized> Executor<A> for CommandExecutor {
    fn execute(&self, _snapshot: &A, plan: &InstrumentationPlan) -> Result<String, ExecutionError> {
        let command_line = self.command_line();
        info!("Running: {}", command_line);

        let mut command = Command::new(&self.program);
        command.args(&self.args).stderr(Stdio::inherit());

        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }
        if let Some(path) = &self.plan_file {
            Self::write_plan(path, plan)?;
            command.env(PLAN_ENV_VAR, path);
        }

        let output = command.output().map_err(|source| ExecutionError::SpawnFailed {
            command: command_line.clone(),
            source,
        })?;

        match output.status.code() {
            Some(0) => {}
            Some(code) => return Err(ExecutionError::NonZeroExit(code)),
            None => return Err(ExecutionError::Terminated),
        }

        let trace = match &self.trace_file {
            Some(path) => {
                debug!("Reading trace from: {}", path.display());
                std::fs::read_to_string(path)?
            }
            None => String::from_utf8_lossy(&output.stdout).into_owned(),
        };

        if trace.trim().is_empty() {
            return Err(ExecutionError::NoTrace);
        }

        debug!("Received {} bytes of trace", trace.len());
        Ok(trace)
    }
}

/// Trace recorded by an earlier run of the instrumented program
#[derive(Debug, Clone)]
pub struct RecordedTrace {
    path: PathBuf,
}

impl RecordedTrace {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<A: ?Sized> Executor<A> for RecordedTrace {
    fn execute(
        &self,
        _snapshot: &A,
        _plan: &InstrumentationPlan,
    ) -> Result<String, ExecutionError> {
        info!("Using recorded trace: {}", self.path.display());
        let trace = std::fs::read_to_string(&self.path)?;
        if trace.trim().is_empty() {
            return Err(ExecutionError::NoTrace);
        }
        Ok(trace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn run(executor: &impl Executor<()>) -> Result<String, ExecutionError> {
        executor.execute(&(), &InstrumentationPlan::new())
    }

    #[test]
    fn test_recorded_trace() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[(2, 1.5)]").unwrap();

        let trace = run(&RecordedTrace::new(file.path())).unwrap();
        assert_eq!(trace, "[(2, 1.5)]");
    }

    #[test]
    fn test_empty_recorded_trace() {
        let file = NamedTempFile::new().unwrap();
        assert!(matches!(
            run(&RecordedTrace::new(file.path())),
            Err(ExecutionError::NoTrace)
        ));
    }

    #[test]
    fn test_spawn_failure() {
        let executor = CommandExecutor::new("/nonexistent/loopgraph-test-binary");
        assert!(matches!(run(&executor), Err(ExecutionError::SpawnFailed { .. })));
    }

    #[test]
    fn test_from_argv() {
        assert!(CommandExecutor::from_argv(&[]).is_none());
        let executor =
            CommandExecutor::from_argv(&["./a.out".to_string(), "-n".to_string()]).unwrap();
        assert_eq!(executor.command_line(), "./a.out -n");
    }

    #[cfg(unix)]
    #[test]
    fn test_trace_from_stdout() {
        let executor = CommandExecutor::new("sh")
            .with_args(["-c".to_string(), "printf '[(2, 0.25)]'".to_string()]);
        assert_eq!(run(&executor).unwrap(), "[(2, 0.25)]");
    }

    #[cfg(unix)]
    #[test]
    fn test_non_zero_exit() {
        let executor =
            CommandExecutor::new("sh").with_args(["-c".to_string(), "exit 3".to_string()]);
        assert!(matches!(run(&executor), Err(ExecutionError::NonZeroExit(3))));
    }

    #[cfg(unix)]
    #[test]
    fn test_plan_is_exported() {
        let dir = tempfile::tempdir().unwrap();
        let plan_path = dir.path().join("plan.json");
        let executor = CommandExecutor::new("sh")
            .with_args(["-c".to_string(), "cat \"$LOOPGRAPH_PLAN\"".to_string()])
            .with_plan_file(&plan_path);

        let mut plan = InstrumentationPlan::new();
        plan.add_loop(crate::ast::NodeId(1), "for_1");
        let out = executor.execute(&(), &plan).unwrap();

        assert!(plan_path.exists());
        assert!(out.contains("for_1"));
    }
}
