//! Bounded graph cache keyed by correlation id.
//!
//! Thread-safe via DashMap so the API server's connection threads can share
//! one instance. When full, the oldest insertion is evicted.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::domain::graph::ExecutionGraph;

pub struct GraphCache {
    capacity: usize,
    entries: DashMap<String, (u64, Arc<ExecutionGraph>)>,
    clock: AtomicU64,
}

impl GraphCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: DashMap::new(),
            clock: AtomicU64::new(0),
        }
    }

    pub fn get(&self, correlation_id: &str) -> Option<Arc<ExecutionGraph>> {
        self.entries
            .get(correlation_id)
            .map(|entry| Arc::clone(&entry.value().1))
    }

    /// Insert or replace a graph, evicting the oldest entries over capacity.
    pub fn insert(&self, correlation_id: &str, graph: ExecutionGraph) -> Arc<ExecutionGraph> {
        let graph = Arc::new(graph);
        let stamp = self.clock.fetch_add(1, Ordering::Relaxed);
        self.entries
            .insert(correlation_id.to_string(), (stamp, Arc::clone(&graph)));

        while self.entries.len() > self.capacity {
            // Collect first; removing while iterating would deadlock the shard.
            let oldest = self
                .entries
                .iter()
                .min_by_key(|entry| entry.value().0)
                .map(|entry| entry.key().clone());
            match oldest {
                Some(key) => {
                    tracing::debug!(correlation_id = %key, "evicting cached graph");
                    self.entries.remove(&key);
                }
                None => break,
            }
        }
        graph
    }

    pub fn invalidate(&self, correlation_id: &str) -> bool {
        self.entries.remove(correlation_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
