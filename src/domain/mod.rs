// Domain model and the graph reconstruction pipeline.

pub mod ancestry;
pub mod canonical;
pub mod graph;
pub mod lanes;
pub mod record;

pub use graph::{build_graph, ExecutionGraph, GraphBuilder};
pub use record::{ExecutionMode, TraceRecord};
