//! Ancestor Inference
//!
//! Finds, for each record in canonical order, the most plausible caller among
//! the other records of the group. A candidate `p` is eligible for child `c`
//! only when it is strictly shallower, not later in time, and shares the type
//! prefix. Eligible candidates are ranked by
//!
//! ```text
//! score(p, c) = -(ts(c) - ts(p)) - 1000 * (depth(c) - depth(p))
//! ```
//!
//! so the depth gap dominates the time gap. Exact ties go to the candidate
//! that appears first in canonical order.

use crate::domain::record::TraceRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Weight of one level of depth gap, in milliseconds of time gap.
pub const DEPTH_GAP_WEIGHT: i64 = 1000;

/// How candidates are enumerated. Both strategies pick the same ancestors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InferenceStrategy {
    /// Scan every record for every child, O(n²).
    #[default]
    Exhaustive,
    /// Scan only records sharing the child's type prefix.
    PrefixIndexed,
}

impl InferenceStrategy {
    pub fn from_name(s: &str) -> Option<InferenceStrategy> {
        match s.to_lowercase().as_str() {
            "exhaustive" => Some(InferenceStrategy::Exhaustive),
            "prefix-indexed" | "indexed" => Some(InferenceStrategy::PrefixIndexed),
            _ => None,
        }
    }
}

/// True when `parent` may be reported as the ancestor of `child`.
pub fn is_eligible(parent: &TraceRecord, child: &TraceRecord) -> bool {
    parent.depth < child.depth
        && parent.timestamp_ms <= child.timestamp_ms
        && parent.type_prefix() == child.type_prefix()
}

/// Score of an eligible candidate; higher is better.
pub fn ancestor_score(parent: &TraceRecord, child: &TraceRecord) -> i64 {
    let time_gap = child.timestamp_ms.saturating_sub(parent.timestamp_ms);
    let depth_gap = i64::from(child.depth) - i64::from(parent.depth);
    time_gap
        .saturating_neg()
        .saturating_sub(DEPTH_GAP_WEIGHT.saturating_mul(depth_gap))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AncestorInferencer {
    strategy: InferenceStrategy,
}

impl AncestorInferencer {
    pub fn new(strategy: InferenceStrategy) -> Self {
        Self { strategy }
    }

    /// For every canonical position, the canonical position of its inferred
    /// ancestor, or `None` when no eligible candidate exists.
    pub fn infer(&self, canonical: &[TraceRecord]) -> Vec<Option<usize>> {
        let ancestors: Vec<Option<usize>> = match self.strategy {
            InferenceStrategy::Exhaustive => {
                let all: Vec<usize> = (0..canonical.len()).collect();
                canonical
                    .iter()
                    .enumerate()
                    .map(|(i, _)| best_candidate(canonical, i, &all))
                    .collect()
            }
            InferenceStrategy::PrefixIndexed => {
                // Buckets are filled in canonical order, which keeps the tie-break intact.
                let mut buckets: HashMap<&str, Vec<usize>> = HashMap::new();
                for (pos, record) in canonical.iter().enumerate() {
                    buckets.entry(record.type_prefix()).or_default().push(pos);
                }
                canonical
                    .iter()
                    .enumerate()
                    .map(|(i, record)| match buckets.get(record.type_prefix()) {
                        Some(bucket) => best_candidate(canonical, i, bucket),
                        None => None,
                    })
                    .collect()
            }
        };

        let orphans = canonical
            .iter()
            .zip(&ancestors)
            .filter(|(r, a)| r.depth > 0 && a.is_none())
            .count();
        if orphans > 0 {
            tracing::debug!(
                orphans,
                "records with non-zero depth have no discoverable ancestor"
            );
        }
        ancestors
    }
}

/// Best eligible candidate for the child at `child_pos`, scanning `candidates`
/// in ascending canonical order.
fn best_candidate(
    canonical: &[TraceRecord],
    child_pos: usize,
    candidates: &[usize],
) -> Option<usize> {
    let child = &canonical[child_pos];
    if child.depth == 0 {
        return None;
    }

    let mut best: Option<(usize, i64)> = None;
    for &pos in candidates {
        if pos == child_pos {
            continue;
        }
        let parent = &canonical[pos];
        if !is_eligible(parent, child) {
            continue;
        }
        let score = ancestor_score(parent, child);
        // Strictly greater: an earlier candidate keeps an exact tie.
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((pos, score));
        }
    }
    best.map(|(pos, _)| pos)
}
