//! Trace Record Model
//!
//! One flat execution-trace step of a correlation group. Records carry no
//! parent reference; ancestry is inferred later from depth, time and type.

use serde::{Deserialize, Serialize};

/// Delimiter separating the root component from the rest of a type name.
pub const TYPE_DELIMITER: char = '.';

/// Execution mode reported by the originating platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    #[default]
    Synchronous,
    Asynchronous,
}

/// A single normalized trace record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceRecord {
    /// Opaque unique identifier
    pub id: String,
    /// Dotted logical name, e.g. "Contoso.Plugins.OnCreate" (may be empty)
    pub type_name: String,
    /// Stage/operation label, e.g. "Create"
    pub message: String,
    pub mode: ExecutionMode,
    pub duration_ms: f64,
    pub has_exception: bool,
    /// Nesting level as reported by the platform; not necessarily contiguous
    pub depth: u32,
    /// Milliseconds since the unix epoch
    pub timestamp_ms: i64,
}

impl TraceRecord {
    /// Convenience constructor used by adapters and tests.
    pub fn new(
        id: impl Into<String>,
        type_name: impl Into<String>,
        message: impl Into<String>,
        depth: u32,
        timestamp_ms: i64,
    ) -> Self {
        Self {
            id: id.into(),
            type_name: type_name.into(),
            message: message.into(),
            mode: ExecutionMode::Synchronous,
            duration_ms: 0.0,
            has_exception: false,
            depth,
            timestamp_ms,
        }
    }

    /// Substring of the type name before the first delimiter, or the whole name.
    pub fn type_prefix(&self) -> &str {
        self.type_name
            .split(TYPE_DELIMITER)
            .next()
            .unwrap_or(&self.type_name)
    }

    /// Last segment of the type name, used for compact labels.
    pub fn short_type_name(&self) -> &str {
        self.type_name
            .rsplit(TYPE_DELIMITER)
            .next()
            .unwrap_or(&self.type_name)
    }
}
