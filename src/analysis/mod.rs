//! Static loop analysis.
//!
//! This module handles:
//! - Discovering loops and their nesting rank
//! - Classifying loop bounds as constant or dynamic
//! - Deriving nested and call edges between loops

pub mod bound;
pub mod collector;
pub mod edges;

// Re-export main types
pub use bound::{analyze_bound, classify_condition, is_constant, BoundAnalysis, BoundClass};
pub use collector::{LoopCollector, LoopNode};
pub use edges::{EdgeBuilder, EdgeKind, LoopEdge};
