//! Swim-lane DOT Exporter
//!
//! Exports an ExecutionGraph as Graphviz DOT: one cluster per lane, nodes
//! pinned at their (lane, row) position so `neato -n` keeps the layout.

use crate::domain::graph::{ExecutionGraph, GraphNode};
use crate::domain::record::ExecutionMode;

pub struct SwimlaneExporter;

impl SwimlaneExporter {
    /// Convert an ExecutionGraph to a DOT string.
    pub fn to_dot(graph: &ExecutionGraph) -> String {
        let mut lines = Vec::new();

        lines.push("digraph CorrelationFlow {".to_string());
        lines.push("    rankdir=LR;".to_string());
        lines.push("    splines=ortho;".to_string());
        lines.push("    node [fontname=\"Helvetica\", fontsize=11, shape=box];".to_string());
        lines.push("    edge [fontname=\"Helvetica\", fontsize=9];".to_string());
        lines.push("".to_string());

        for (lane, nodes) in graph.nodes_by_lane().iter().enumerate() {
            lines.push(format!("    subgraph cluster_lane_{} {{", lane));
            lines.push(format!("        label=\"Depth {}\";", Self::lane_depth(nodes)));
            lines.push("        style=\"rounded,dashed\";".to_string());
            lines.push("        color=\"#9ca0b0\";".to_string());
            for node in nodes {
                lines.push(format!("        {}", Self::node_line(node)));
            }
            lines.push("    }".to_string());
        }

        lines.push("".to_string());

        for edge in &graph.edges {
            lines.push(format!(
                "    \"{}\" -> \"{}\";",
                Self::escape(&edge.source_id),
                Self::escape(&edge.target_id)
            ));
        }

        lines.push("}".to_string());
        lines.join("\n")
    }

    fn lane_depth(nodes: &[&GraphNode]) -> String {
        nodes
            .first()
            .map(|n| n.depth.to_string())
            .unwrap_or_default()
    }

    fn node_line(node: &GraphNode) -> String {
        let (fill, border) = if node.has_exception {
            ("#f38ba8", "#d20f39") // Red
        } else {
            ("#89b4fa", "#1e66f5") // Blue
        };
        let style = match node.mode {
            ExecutionMode::Synchronous => "filled",
            ExecutionMode::Asynchronous => "filled,dashed",
        };
        let label = format!("{}\\n{:.0} ms", Self::escape(&node.label), node.duration_ms);
        format!(
            "\"{}\" [label=\"{}\", style=\"{}\", fillcolor=\"{}\", color=\"{}\", pos=\"{:.0},{:.0}!\"];",
            Self::escape(&node.id),
            label,
            style,
            fill,
            border,
            node.position.x,
            // Graphviz y grows upwards; rows grow downwards.
            0.0 - node.position.y
        )
    }

    fn escape(label: &str) -> String {
        label
            .replace('\\', "\\\\")
            .replace('"', "\\\"")
            .replace('\n', "\\n")
    }
}
