use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::graph::{EdgeKind, ExecutionGraph, Position};
use crate::domain::record::{ExecutionMode, TraceRecord};

/// Trace record as delivered by the fetch collaborator. Numeric fields are
/// kept as raw JSON so a single bad value can be defaulted instead of
/// failing the whole group.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawTraceRecord {
    pub id: Option<String>,
    pub correlation_id: Option<String>,
    pub type_name: Option<String>,
    pub message: Option<String>,
    pub mode: Value,
    pub duration_ms: Value,
    pub has_exception: Option<bool>,
    pub depth: Value,
    pub timestamp: Value,
}

impl RawTraceRecord {
    /// Convert into a domain record. `index` names records that lack an id.
    pub fn normalize(&self, index: usize) -> TraceRecord {
        let id = match &self.id {
            Some(id) if !id.is_empty() => id.clone(),
            _ => {
                tracing::warn!(index, "trace record without id");
                format!("record-{}", index)
            }
        };

        let depth = parse_depth(&self.depth).unwrap_or_else(|| {
            tracing::warn!(record = %id, value = %self.depth, "unusable depth, defaulting to 0");
            0
        });
        let timestamp_ms = parse_timestamp(&self.timestamp).unwrap_or_else(|| {
            tracing::warn!(record = %id, value = %self.timestamp, "unusable timestamp, defaulting to epoch");
            0
        });
        let duration_ms = match self.duration_ms.as_f64() {
            Some(d) if d.is_finite() && d >= 0.0 => d,
            _ => {
                if !self.duration_ms.is_null() {
                    tracing::warn!(record = %id, value = %self.duration_ms, "unusable duration, defaulting to 0");
                }
                0.0
            }
        };

        TraceRecord {
            id,
            type_name: self.type_name.clone().unwrap_or_default(),
            message: self.message.clone().unwrap_or_default(),
            mode: parse_mode(&self.mode),
            duration_ms,
            has_exception: self.has_exception.unwrap_or(false),
            depth,
            timestamp_ms,
        }
    }
}

fn parse_depth(value: &Value) -> Option<u32> {
    if let Some(d) = value.as_u64() {
        return u32::try_from(d).ok();
    }
    match value.as_f64() {
        Some(d) if d.is_finite() && d >= 0.0 && d <= f64::from(u32::MAX) => Some(d as u32),
        _ => None,
    }
}

fn parse_timestamp(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|t| t.is_finite() && t.abs() < i64::MAX as f64)
                .map(|t| t.round() as i64)
        }),
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|t| t.timestamp_millis()),
        _ => None,
    }
}

fn parse_mode(value: &Value) -> ExecutionMode {
    let asynchronous = match value {
        Value::String(s) => matches!(s.to_lowercase().as_str(), "async" | "asynchronous" | "1"),
        Value::Number(n) => n.as_i64() == Some(1),
        _ => false,
    };
    if asynchronous {
        ExecutionMode::Asynchronous
    } else {
        ExecutionMode::Synchronous
    }
}

/// Normalize a whole correlation group.
pub fn normalize_all(raw: &[RawTraceRecord]) -> Vec<TraceRecord> {
    raw.iter()
        .enumerate()
        .map(|(i, r)| r.normalize(i))
        .collect()
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphDto {
    pub nodes: Vec<NodeDto>,
    pub edges: Vec<EdgeDto>,
    pub lane_count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDto {
    pub id: String,
    pub label: String,
    pub lane: usize,
    pub row: usize,
    pub position: Position,
    pub type_name: String,
    pub message: String,
    pub mode: ExecutionMode,
    pub depth: u32,
    pub duration_ms: f64,
    pub has_exception: bool,
    pub timestamp_ms: i64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeDto {
    pub id: String,
    pub source_id: String,
    pub target_id: String,
    pub kind: EdgeKind,
}

impl From<&ExecutionGraph> for GraphDto {
    fn from(graph: &ExecutionGraph) -> Self {
        let nodes = graph
            .nodes
            .iter()
            .map(|n| NodeDto {
                id: n.id.clone(),
                label: n.label.clone(),
                lane: n.lane,
                row: n.row,
                position: n.position,
                type_name: n.type_name.clone(),
                message: n.message.clone(),
                mode: n.mode,
                depth: n.depth,
                duration_ms: n.duration_ms,
                has_exception: n.has_exception,
                timestamp_ms: n.timestamp_ms,
            })
            .collect();

        let edges = graph
            .edges
            .iter()
            .map(|e| EdgeDto {
                id: e.id.clone(),
                source_id: e.source_id.clone(),
                target_id: e.target_id.clone(),
                kind: e.kind,
            })
            .collect();

        GraphDto {
            nodes,
            edges,
            lane_count: graph.lane_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawTraceRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_normalizes_well_formed_record() {
        let record = raw(json!({
            "id": "r1",
            "correlationId": "c1",
            "typeName": "Contoso.Plugins.OnCreate",
            "message": "Create",
            "mode": "Asynchronous",
            "durationMs": 12.5,
            "hasException": true,
            "depth": 2,
            "timestamp": "2024-03-01T10:00:00.250Z"
        }))
        .normalize(0);

        assert_eq!(record.id, "r1");
        assert_eq!(record.depth, 2);
        assert_eq!(record.mode, ExecutionMode::Asynchronous);
        assert_eq!(record.duration_ms, 12.5);
        assert!(record.has_exception);
        assert_eq!(record.timestamp_ms, 1_709_287_200_250);
    }

    #[test]
    fn test_bad_fields_fall_back_to_defaults() {
        let record = raw(json!({
            "typeName": "Foo.Bar",
            "depth": -3,
            "timestamp": "not a date",
            "durationMs": -1
        }))
        .normalize(7);

        assert_eq!(record.id, "record-7");
        assert_eq!(record.depth, 0);
        assert_eq!(record.timestamp_ms, 0);
        assert_eq!(record.duration_ms, 0.0);
        assert_eq!(record.mode, ExecutionMode::Synchronous);
    }

    #[test]
    fn test_numeric_timestamp_and_float_depth() {
        let record = raw(json!({ "id": "x", "depth": 1.0, "timestamp": 1500.4 })).normalize(0);
        assert_eq!(record.depth, 1);
        assert_eq!(record.timestamp_ms, 1500);
    }

    #[test]
    fn test_graph_dto_uses_camel_case() {
        let graph = crate::domain::build_graph(&[TraceRecord::new("a", "Foo", "Create", 0, 0)]);
        let value = serde_json::to_value(GraphDto::from(&graph)).unwrap();
        assert_eq!(value["laneCount"], 1);
        assert_eq!(value["nodes"][0]["typeName"], "Foo");
    }
}
