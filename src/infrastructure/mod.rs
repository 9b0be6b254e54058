// Infrastructure implementations for Traceflow.

pub mod concurrency;
pub mod config;
pub mod graph_cache;

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Context, Result};

use crate::api::dto::{GraphDto, RawTraceRecord};
use crate::domain::graph::ExecutionGraph;
use crate::domain::record::TraceRecord;
use crate::error::TraceflowError;
use crate::ports::swimlane_exporter::SwimlaneExporter;
use crate::ports::{GraphExporter, TraceSource};

pub use graph_cache::GraphCache;

/// Reads a JSON array of trace records exported from the tracing platform.
pub struct JsonFileTraceSource {
    records: Vec<RawTraceRecord>,
}

impl JsonFileTraceSource {
    pub fn open(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read trace file {}", path.display()))?;
        let records = Self::parse(&content)
            .with_context(|| format!("Invalid trace file {}", path.display()))?;
        tracing::info!(path = %path.display(), records = records.len(), "loaded trace file");
        Ok(Self { records })
    }

    pub fn parse(content: &str) -> Result<Vec<RawTraceRecord>> {
        Ok(serde_json::from_str(content)?)
    }

    fn has_correlation_ids(&self) -> bool {
        self.records.iter().any(|r| r.correlation_id.is_some())
    }

    /// Every correlation group in the file, in order of first appearance.
    /// Records without a correlation id form the group with an empty key.
    pub fn group_by_correlation(&self) -> Vec<(String, Vec<TraceRecord>)> {
        let mut groups: Vec<(String, Vec<TraceRecord>)> = Vec::new();
        for (index, raw) in self.records.iter().enumerate() {
            let key = raw.correlation_id.clone().unwrap_or_default();
            let record = raw.normalize(index);
            match groups.iter_mut().find(|(k, _)| *k == key) {
                Some((_, group)) => group.push(record),
                None => groups.push((key, vec![record])),
            }
        }
        groups
    }
}

impl TraceSource for JsonFileTraceSource {
    fn fetch(&self, correlation_id: &str) -> Result<Vec<TraceRecord>> {
        // A file without any correlation ids is a single group; otherwise the
        // empty id selects the records that carry none.
        let filter = self.has_correlation_ids();
        let records: Vec<TraceRecord> = self
            .records
            .iter()
            .enumerate()
            .filter(|(_, r)| !filter || r.correlation_id.as_deref().unwrap_or_default() == correlation_id)
            .map(|(index, r)| r.normalize(index))
            .collect();

        if records.is_empty() {
            return Err(TraceflowError::UnknownCorrelation(correlation_id.to_string()).into());
        }
        Ok(records)
    }
}

/// Output formats understood by the CLI and server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Dot,
    Json,
}

impl ExportFormat {
    pub fn parse(s: &str) -> Result<ExportFormat, TraceflowError> {
        match s.to_lowercase().as_str() {
            "dot" | "gv" => Ok(ExportFormat::Dot),
            "json" => Ok(ExportFormat::Json),
            _ => Err(TraceflowError::UnknownFormat(s.to_string())),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Dot => "dot",
            ExportFormat::Json => "json",
        }
    }

    pub fn exporter(&self) -> &'static dyn GraphExporter {
        match self {
            ExportFormat::Dot => &DotExporter,
            ExportFormat::Json => &JsonExporter,
        }
    }
}

/// One output file per correlation group under `dir`. Ids are reduced to
/// `[A-Za-z0-9_-]`; stems that collide after that get a `-2`, `-3`, ... suffix.
pub fn group_output_paths(dir: &Path, correlation_ids: &[&str], format: ExportFormat) -> Vec<PathBuf> {
    let mut used: HashSet<String> = HashSet::new();
    correlation_ids
        .iter()
        .map(|id| {
            let base: String = if id.is_empty() {
                "uncorrelated".to_string()
            } else {
                id.chars()
                    .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
                    .collect()
            };
            let mut stem = base.clone();
            let mut n = 2;
            while !used.insert(stem.clone()) {
                stem = format!("{}-{}", base, n);
                n += 1;
            }
            dir.join(format!("{}.{}", stem, format.extension()))
        })
        .collect()
}

pub struct DotExporter;
impl GraphExporter for DotExporter {
    fn export(&self, graph: &ExecutionGraph, path: &Path) -> Result<()> {
        fs::write(path, SwimlaneExporter::to_dot(graph))
            .with_context(|| format!("Failed to write {}", path.display()))
    }
}

pub struct JsonExporter;
impl GraphExporter for JsonExporter {
    fn export(&self, graph: &ExecutionGraph, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(&GraphDto::from(graph))?;
        fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
    }
}
