//! Canonical Ordering
//!
//! Sorts a correlation group into the single total order every later stage
//! relies on. The position in this order is the node's row.

use crate::domain::record::TraceRecord;

/// Return a copy of `records` sorted by (timestamp, depth, message, type name).
/// Equal records keep their input order.
pub fn canonicalize(records: &[TraceRecord]) -> Vec<TraceRecord> {
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| {
        a.timestamp_ms
            .cmp(&b.timestamp_ms)
            .then_with(|| a.depth.cmp(&b.depth))
            .then_with(|| a.message.cmp(&b.message))
            .then_with(|| a.type_name.cmp(&b.type_name))
    });
    sorted
}
