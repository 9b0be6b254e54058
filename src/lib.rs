// Main library entry point for Traceflow.

pub mod api;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod ports;

pub use domain::{build_graph, ExecutionGraph, GraphBuilder, TraceRecord};
pub use error::TraceflowError;
