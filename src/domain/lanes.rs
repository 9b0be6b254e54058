//! Lane Assignment
//!
//! Maps reported depths to compact zero-based lanes, so observed depths
//! `{1, 3}` render as lanes `{0, 1}`.

use crate::domain::record::TraceRecord;
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, Default)]
pub struct LaneMap {
    depths: Vec<u32>,
    ranks: HashMap<u32, usize>,
}

impl LaneMap {
    pub fn from_records(records: &[TraceRecord]) -> Self {
        let distinct: BTreeSet<u32> = records.iter().map(|r| r.depth).collect();
        let depths: Vec<u32> = distinct.into_iter().collect();
        let ranks = depths
            .iter()
            .enumerate()
            .map(|(rank, depth)| (*depth, rank))
            .collect();
        Self { depths, ranks }
    }

    /// Lane of a depth observed in the group. Unknown depths fall into the
    /// lane of the nearest smaller observed depth.
    pub fn lane_of(&self, depth: u32) -> usize {
        match self.ranks.get(&depth) {
            Some(rank) => *rank,
            None => self.depths.partition_point(|d| *d <= depth).saturating_sub(1),
        }
    }

    pub fn lane_count(&self) -> usize {
        self.depths.len()
    }

    /// Observed depths, ascending; index = lane.
    pub fn depths(&self) -> &[u32] {
        &self.depths
    }
}
