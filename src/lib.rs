//! Loopgraph
//!
//! Correlated static/dynamic profiling of loop nests: loop discovery
//! with nesting ranks, constant-bound analysis, nested and call edges
//! between loops, probe placement, trace aggregation and a property
//! graph that carries both kinds of attributes.
//!
//! This crate provides the core implementation for the
//! `loopgraph` CLI tool.
//!
//! ## Getting Started
//!
//! ```ignore
//! use loopgraph::ast::TreeAst;
//! use loopgraph::pipeline::LoopProfiler;
//! use loopgraph::runner::RecordedTrace;
//! use loopgraph::utils::config::AnalysisConfig;
//!
//! let ast = TreeAst::load("nest.json")?;
//! let mut profiler = LoopProfiler::new(ast, AnalysisConfig::default());
//! profiler.analyze();
//! profiler.run(&RecordedTrace::new("trace.txt"))?;
//! let graph = profiler.assemble();
//! ```

pub mod aggregator;
pub mod analysis;
pub mod ast;
pub mod commands;
pub mod graph;
pub mod instrument;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod runner;
pub mod utils;
