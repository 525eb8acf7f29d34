//! Loop graph assembly and presentation hooks.

pub mod assembler;

// Re-export main types
pub use assembler::{
    default_edge_color, default_edge_label, default_node_color, default_node_label,
    EdgeFormatter, GraphAssembler, GraphStyle, LoopGraph, NodeFormatter,
};
