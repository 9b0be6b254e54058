use std::path::Path;

use anyhow::Result;

use crate::domain::graph::ExecutionGraph;
use crate::domain::record::TraceRecord;

pub mod swimlane_exporter;

/// Ordered fetch of every record sharing one correlation id.
pub trait TraceSource {
    fn fetch(&self, correlation_id: &str) -> Result<Vec<TraceRecord>>;
}

pub trait GraphExporter {
    fn export(&self, graph: &ExecutionGraph, path: &Path) -> Result<()>;
}
