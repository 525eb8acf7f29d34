//! Probe placement policy.
//!
//! Decides where probes go and what they emit. Writing them into the
//! program is delegated to a [`ProbeWriter`].
//!
//! Per loop:
//! - a scoped timer around the loop emitting `(0, tag, seconds)`
//! - a scoped iteration counter around the loop emitting `(1, tag, count)`
//! - a counter tick at the start of every iteration body
//!
//! For the entry function only:
//! - the trace channel (connect + `[` before, `]` + disconnect after)
//! - a program timer around the wrapped body emitting `(2, seconds)`

use crate::ast::{EntityKind, NodeId, ProgramAst};
use crate::parser::EventKind;
use crate::utils::config::{AnalysisConfig, PROBE_RUNTIME_HEADER};
use crate::utils::error::InstrumentError;
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::BTreeSet;

/// Where a probe is anchored relative to its target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeSite {
    /// Top of a source module
    ModuleBegin,
    /// Scope enclosing the whole loop statement
    LoopScope,
    /// First statement of every iteration
    LoopBodyBegin,
    /// Scope enclosing the whole function body
    FunctionBody,
}

/// What a probe does
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "probe")]
pub enum Probe {
    /// Makes the probe runtime available to the module
    RuntimeHeader { header: String },
    /// Released on every scope exit, emitting elapsed time
    LoopTimer { tag: String },
    /// Released on every scope exit, emitting the final count
    IterationCounter { tag: String },
    /// Increments the loop's counter
    CounterTick { tag: String },
    /// Released when the entry function body exits
    ProgramTimer,
    /// Connect + open marker before, close marker + disconnect after
    TraceChannel,
}

impl Probe {
    /// Trace event kind this probe emits on release
    pub fn emits(&self) -> Option<EventKind> {
        match self {
            Self::LoopTimer { .. } => Some(EventKind::LoopTimer),
            Self::IterationCounter { .. } => Some(EventKind::LoopCounter),
            Self::ProgramTimer => Some(EventKind::ProgramTimer),
            _ => None,
        }
    }
}

/// A probe anchored at a program node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Placement {
    pub target: NodeId,
    pub site: ProbeSite,
    pub probe: Probe,
}

/// External capability that materializes placements in a program copy
pub trait ProbeWriter {
    fn place(&mut self, placement: &Placement) -> Result<(), InstrumentError>;

    /// Finalize all placed probes
    fn commit(&mut self) -> Result<(), InstrumentError> {
        Ok(())
    }
}

/// Ordered set of placements for one program
#[derive(Debug, Clone, Default, Serialize)]
pub struct InstrumentationPlan {
    placements: Vec<Placement>,
    #[serde(skip)]
    loops: BTreeSet<NodeId>,
    #[serde(skip)]
    modules: BTreeSet<NodeId>,
    entry: Option<NodeId>,
}

impl InstrumentationPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Timer, counter and tick for one loop
    ///
    /// Returns false if the loop was already planned.
    pub fn add_loop(&mut self, loop_id: NodeId, tag: &str) -> bool {
        if !self.loops.insert(loop_id) {
            return false;
        }

        let tag = tag.to_string();
        self.placements.push(Placement {
            target: loop_id,
            site: ProbeSite::LoopScope,
            probe: Probe::LoopTimer { tag: tag.clone() },
        });
        self.placements.push(Placement {
            target: loop_id,
            site: ProbeSite::LoopScope,
            probe: Probe::IterationCounter { tag: tag.clone() },
        });
        self.placements.push(Placement {
            target: loop_id,
            site: ProbeSite::LoopBodyBegin,
            probe: Probe::CounterTick { tag },
        });
        true
    }

    /// Channel lifecycle and program timer for the entry function
    ///
    /// Returns false if an entry function was already planned.
    pub fn set_entry(&mut self, function: NodeId) -> bool {
        if self.entry.is_some() {
            return false;
        }
        self.entry = Some(function);
        self.placements.push(Placement {
            target: function,
            site: ProbeSite::FunctionBody,
            probe: Probe::TraceChannel,
        });
        self.placements.push(Placement {
            target: function,
            site: ProbeSite::FunctionBody,
            probe: Probe::ProgramTimer,
        });
        true
    }

    pub fn add_module(&mut self, module: NodeId) -> bool {
        if !self.modules.insert(module) {
            return false;
        }
        self.placements.push(Placement {
            target: module,
            site: ProbeSite::ModuleBegin,
            probe: Probe::RuntimeHeader {
                header: PROBE_RUNTIME_HEADER.to_string(),
            },
        });
        true
    }

    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    pub fn entry(&self) -> Option<NodeId> {
        self.entry
    }

    pub fn loop_count(&self) -> usize {
        self.loops.len()
    }

    /// Placements anchored at one node
    pub fn placements_for(&self, target: NodeId) -> Vec<&Placement> {
        self.placements.iter().filter(|p| p.target == target).collect()
    }
}

/// Plans and applies probes
#[derive(Debug, Clone)]
pub struct Instrumenter {
    entry_function: String,
}

impl Default for Instrumenter {
    fn default() -> Self {
        Self::new(&AnalysisConfig::default())
    }
}

impl Instrumenter {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            entry_function: config.entry_function.clone(),
        }
    }

    /// Decide every probe for a program
    ///
    /// **Public** - pure policy, the program is not modified
    pub fn plan<A: ProgramAst + ?Sized>(&self, ast: &A) -> InstrumentationPlan {
        let mut plan = InstrumentationPlan::new();

        for module in ast.entities(EntityKind::Module) {
            plan.add_module(module);
        }

        for function in ast.entities(EntityKind::Function) {
            for (loop_id, _) in ast.rank(function, EntityKind::Loop) {
                match ast.node(loop_id) {
                    Ok(node) => {
                        plan.add_loop(loop_id, &node.tag);
                    }
                    Err(e) => warn!("Not instrumenting loop {}: {}", loop_id, e),
                }
            }

            let is_entry = ast
                .node(function)
                .map(|n| n.name.as_deref() == Some(self.entry_function.as_str()))
                .unwrap_or(false);
            if is_entry && !plan.set_entry(function) {
                warn!(
                    "Multiple '{}' functions; only the first is instrumented",
                    self.entry_function
                );
            }
        }

        if plan.entry().is_none() {
            warn!(
                "Entry function '{}' not found; the trace will have no channel or program timer",
                self.entry_function
            );
        }

        debug!(
            "Planned {} placements for {} loops",
            plan.placements().len(),
            plan.loop_count()
        );
        plan
    }

    /// Write every placement through the writer and commit
    ///
    /// # Returns
    /// Number of placements written
    pub fn apply<W: ProbeWriter + ?Sized>(
        &self,
        plan: &InstrumentationPlan,
        writer: &mut W,
    ) -> Result<usize, InstrumentError> {
        for placement in plan.placements() {
            writer.place(placement)?;
        }
        writer.commit()?;
        Ok(plan.placements().len())
    }

    /// Plan against `ast` and apply to a fresh snapshot of it
    ///
    /// The analysed program itself is never modified.
    pub fn instrument<A>(&self, ast: &A) -> Result<(A, InstrumentationPlan), InstrumentError>
    where
        A: ProgramAst + ProbeWriter,
    {
        let plan = self.plan(ast);
        let mut snapshot = ast.snapshot();
        let written = self.apply(&plan, &mut snapshot)?;
        info!("Instrumented snapshot with {} probes", written);
        Ok((snapshot, plan))
    }
}
