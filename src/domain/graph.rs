//! Execution Graph
//!
//! Assembles the canonical order, lane map and inferred ancestry into
//! positioned nodes and ParentChild edges for swim-lane rendering.

use crate::domain::ancestry::{AncestorInferencer, InferenceStrategy};
use crate::domain::canonical::canonicalize;
use crate::domain::lanes::LaneMap;
use crate::domain::record::{ExecutionMode, TraceRecord};
use serde::{Deserialize, Serialize};

/// Spacing used to turn (lane, row) into diagram coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub lane_width: f64,
    pub row_height: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            lane_width: 280.0,
            row_height: 90.0,
        }
    }
}

impl LayoutConfig {
    pub fn position(&self, lane: usize, row: usize) -> Position {
        Position {
            x: lane as f64 * self.lane_width,
            y: row as f64 * self.row_height,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// A positioned node; one per input record.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    pub id: String,
    /// Compact rank of the record's depth
    pub lane: usize,
    /// Position in canonical order
    pub row: usize,
    pub position: Position,
    pub label: String,
    pub type_name: String,
    pub message: String,
    pub mode: ExecutionMode,
    pub depth: u32,
    pub duration_ms: f64,
    pub has_exception: bool,
    pub timestamp_ms: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeKind {
    ParentChild,
}

/// Inferred link from an ancestor to the record it plausibly triggered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphEdge {
    pub id: String,
    pub source_id: String,
    pub target_id: String,
    pub kind: EdgeKind,
}

/// Reconstructed graph of one correlation group.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExecutionGraph {
    /// Nodes in canonical order (`nodes[i].row == i`)
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub lane_count: usize,
}

impl ExecutionGraph {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn parent_of(&self, id: &str) -> Option<&GraphNode> {
        self.edges
            .iter()
            .find(|e| e.target_id == id)
            .and_then(|e| self.node(&e.source_id))
    }

    pub fn children_of(&self, id: &str) -> Vec<&GraphNode> {
        self.edges
            .iter()
            .filter(|e| e.source_id == id)
            .filter_map(|e| self.node(&e.target_id))
            .collect()
    }

    /// Nodes without an incoming edge, in row order.
    pub fn roots(&self) -> Vec<&GraphNode> {
        self.nodes
            .iter()
            .filter(|n| !self.edges.iter().any(|e| e.target_id == n.id))
            .collect()
    }

    /// Nodes grouped by lane for swim-lane rendering.
    pub fn nodes_by_lane(&self) -> Vec<Vec<&GraphNode>> {
        let mut lanes = vec![Vec::new(); self.lane_count];
        for node in &self.nodes {
            lanes[node.lane].push(node);
        }
        lanes
    }
}

/// Runs the four pipeline stages with a given layout and inference strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphBuilder {
    pub layout: LayoutConfig,
    pub strategy: InferenceStrategy,
}

impl GraphBuilder {
    pub fn new(layout: LayoutConfig, strategy: InferenceStrategy) -> Self {
        Self { layout, strategy }
    }

    pub fn build(&self, records: &[TraceRecord]) -> ExecutionGraph {
        if records.is_empty() {
            return ExecutionGraph::default();
        }

        let canonical = canonicalize(records);
        let lanes = LaneMap::from_records(&canonical);
        let ancestors = AncestorInferencer::new(self.strategy).infer(&canonical);

        let nodes: Vec<GraphNode> = canonical
            .iter()
            .enumerate()
            .map(|(row, record)| self.node_for(record, lanes.lane_of(record.depth), row))
            .collect();

        let edges: Vec<GraphEdge> = ancestors
            .iter()
            .enumerate()
            .filter_map(|(child, ancestor)| {
                ancestor.map(|parent| {
                    let source_id = canonical[parent].id.clone();
                    let target_id = canonical[child].id.clone();
                    GraphEdge {
                        id: format!("{}->{}", source_id, target_id),
                        source_id,
                        target_id,
                        kind: EdgeKind::ParentChild,
                    }
                })
            })
            .collect();

        tracing::debug!(
            nodes = nodes.len(),
            edges = edges.len(),
            lanes = lanes.lane_count(),
            "built execution graph"
        );

        ExecutionGraph {
            nodes,
            edges,
            lane_count: lanes.lane_count(),
        }
    }

    fn node_for(&self, record: &TraceRecord, lane: usize, row: usize) -> GraphNode {
        let label = if record.type_name.is_empty() {
            record.message.clone()
        } else {
            format!("{} ({})", record.short_type_name(), record.message)
        };
        GraphNode {
            id: record.id.clone(),
            lane,
            row,
            position: self.layout.position(lane, row),
            label,
            type_name: record.type_name.clone(),
            message: record.message.clone(),
            mode: record.mode,
            depth: record.depth,
            duration_ms: record.duration_ms,
            has_exception: record.has_exception,
            timestamp_ms: record.timestamp_ms,
        }
    }
}

/// Build the graph of one correlation group with default layout and strategy.
pub fn build_graph(records: &[TraceRecord]) -> ExecutionGraph {
    GraphBuilder::default().build(records)
}
