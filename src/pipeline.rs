//! Sequential phase driver.
//!
//! static analysis -> instrumentation -> one blocking execution ->
//! aggregation -> graph assembly. Each phase consumes the complete output
//! of the previous one. A failed run leaves only the static attributes in
//! place.

use crate::aggregator::{aggregate_trace, ProfileSummary};
use crate::analysis::{EdgeBuilder, LoopCollector, LoopEdge, LoopNode};
use crate::ast::ProgramAst;
use crate::graph::{GraphAssembler, LoopGraph};
use crate::instrument::{InstrumentationPlan, Instrumenter, ProbeWriter};
use crate::runner::Executor;
use crate::utils::config::AnalysisConfig;
use crate::utils::error::ProfileError;
use log::{debug, info, warn};

/// Drives one program through the profiling phases
pub struct LoopProfiler<A> {
    ast: A,
    config: AnalysisConfig,
    loops: Vec<LoopNode>,
    edges: Vec<LoopEdge>,
    analyzed: bool,
    summary: Option<ProfileSummary>,
}

impl<A> LoopProfiler<A>
where
    A: ProgramAst + ProbeWriter,
{
    pub fn new(ast: A, config: AnalysisConfig) -> Self {
        Self {
            ast,
            config,
            loops: Vec::new(),
            edges: Vec::new(),
            analyzed: false,
            summary: None,
        }
    }

    /// Collect loops and derive edges
    ///
    /// **Public** - static phase; runs once, later calls return the cached result
    pub fn analyze(&mut self) -> &[LoopNode] {
        if !self.analyzed {
            self.loops = LoopCollector::collect(&mut self.ast);
            self.edges = EdgeBuilder::new(&self.config).build(&self.ast);
            self.analyzed = true;
            info!(
                "Static analysis: {} loops, {} edges",
                self.loops.len(),
                self.edges.len()
            );
        }
        &self.loops
    }

    /// Probe placements for the analysed program
    pub fn plan(&self) -> InstrumentationPlan {
        Instrumenter::new(&self.config).plan(&self.ast)
    }

    /// Instrument a snapshot, execute it and merge the statistics
    ///
    /// **Public** - dynamic phase
    ///
    /// # Arguments
    /// * `executor` - Builds and runs the instrumented snapshot
    ///
    /// # Errors
    /// * `ProfileError::AlreadyProfiled` - a run was already merged
    /// * `ProfileError::Instrument` / `Execution` / `Trace` - the run failed;
    ///   nothing dynamic is attached
    pub fn run<E>(&mut self, executor: &E) -> Result<&ProfileSummary, ProfileError>
    where
        E: Executor<A> + ?Sized,
    {
        if self.summary.is_some() {
            return Err(ProfileError::AlreadyProfiled);
        }
        self.analyze();

        let (snapshot, plan) = Instrumenter::new(&self.config).instrument(&self.ast)?;
        let raw = executor.execute(&snapshot, &plan)?;
        let summary = aggregate_trace(&raw)?;

        self.merge(summary)
    }

    /// Attach per-tag statistics to every collected loop
    ///
    /// # Errors
    /// * `ProfileError::AlreadyProfiled` - statistics are attached at most once
    pub fn merge(&mut self, summary: ProfileSummary) -> Result<&ProfileSummary, ProfileError> {
        if self.summary.is_some() {
            return Err(ProfileError::AlreadyProfiled);
        }
        self.analyze();

        for known in summary.tags() {
            if !self.loops.iter().any(|l| l.tag == known) {
                warn!("Trace tag '{}' matches no collected loop", known);
            }
        }

        for node in &mut self.loops {
            let stats = summary.stats_for(&node.tag);
            let properties = stats.properties();
            if node.apply_stats(stats) {
                self.ast.set_properties(node.id, properties);
            }
        }

        debug!("Program time: {:.6}s", summary.program_time());
        Ok(self.summary.insert(summary))
    }

    /// Assemble the loop graph from the current attributes
    pub fn assemble(&mut self) -> LoopGraph {
        self.analyze();
        GraphAssembler::assemble(&mut self.ast, &self.edges)
    }

    pub fn ast(&self) -> &A {
        &self.ast
    }

    pub fn loops(&self) -> &[LoopNode] {
        &self.loops
    }

    pub fn edges(&self) -> &[LoopEdge] {
        &self.edges
    }

    pub fn summary(&self) -> Option<&ProfileSummary> {
        self.summary.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{NodeId, TreeAst};
    use crate::utils::error::ExecutionError;
    use serde_json::json;

    fn single_loop() -> TreeAst {
        let tree = json!({
            "kind": "TranslationUnit",
            "children": [{ "kind": "FunctionDecl", "name": "main", "children": [
                { "kind": "WhileStmt", "tag": "w" }
            ]}]
        });
        TreeAst::from_json(&tree.to_string()).unwrap()
    }

    fn ok_trace(_: &TreeAst, _: &InstrumentationPlan) -> Result<String, ExecutionError> {
        Ok("[(1, 'w', 4),(0, 'w', 1.0),(2, 4.0)]".to_string())
    }

    #[test]
    fn test_run_merges_stats_once() {
        let mut profiler = LoopProfiler::new(single_loop(), AnalysisConfig::default());
        let summary = profiler.run(&ok_trace).unwrap();
        assert_eq!(summary.program_time(), 4.0);

        let w = &profiler.loops()[0];
        assert_eq!(w.stats.as_ref().unwrap().percentage_runtime, 25.0);
        assert!(matches!(profiler.run(&ok_trace), Err(ProfileError::AlreadyProfiled)));
    }

    #[test]
    fn test_failed_run_keeps_static_attributes() {
        let failing = |_: &TreeAst, _: &InstrumentationPlan| -> Result<String, ExecutionError> {
            Err(ExecutionError::NonZeroExit(1))
        };
        let mut profiler = LoopProfiler::new(single_loop(), AnalysisConfig::default());

        assert!(profiler.run(&failing).is_err());
        assert!(profiler.summary().is_none());

        let props = profiler.ast().properties(NodeId(2)).unwrap();
        assert!(props.contains_key("bound_static"));
        assert!(!props.contains_key("runtime_avg_iter"));
    }

    #[test]
    fn test_executor_sees_instrumented_snapshot() {
        let inspect = |snapshot: &TreeAst,
                       plan: &InstrumentationPlan|
         -> Result<String, ExecutionError> {
            assert_eq!(snapshot.placements().len(), plan.placements().len());
            assert!(plan.entry().is_some());
            Ok("[(2, 1.0)]".to_string())
        };
        let mut profiler = LoopProfiler::new(single_loop(), AnalysisConfig::default());
        profiler.run(&inspect).unwrap();

        assert!(profiler.ast().placements().is_empty());
    }
}
