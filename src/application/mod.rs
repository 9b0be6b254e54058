use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use rayon::prelude::*;

use crate::domain::graph::{ExecutionGraph, GraphBuilder};
use crate::domain::record::TraceRecord;
use crate::infrastructure::GraphCache;
use crate::ports::{GraphExporter, TraceSource};

/// Fetch one correlation group, build (or reuse) its graph and export it.
pub struct BuildFlowUsecase<'a> {
    pub source: &'a dyn TraceSource,
    pub exporter: &'a dyn GraphExporter,
    pub cache: Option<&'a GraphCache>,
    /// Cache key when the correlation id alone is not unique (defaults to the id)
    pub cache_key: Option<String>,
    pub builder: GraphBuilder,
}

impl<'a> BuildFlowUsecase<'a> {
    pub fn graph(&self, correlation_id: &str) -> Result<Arc<ExecutionGraph>> {
        let key = self.cache_key.as_deref().unwrap_or(correlation_id);
        if let Some(graph) = self.cache.and_then(|c| c.get(key)) {
            tracing::debug!(correlation_id, key, "graph cache hit");
            return Ok(graph);
        }

        let records = self.source.fetch(correlation_id)?;
        let graph = self.builder.build(&records);
        Ok(match self.cache {
            Some(cache) => cache.insert(key, graph),
            None => Arc::new(graph),
        })
    }

    pub fn run(&self, correlation_id: &str, export_path: &Path) -> Result<Arc<ExecutionGraph>> {
        let graph = self.graph(correlation_id)?;
        self.exporter.export(&graph, export_path)?;
        Ok(graph)
    }
}

/// Build several correlation groups in parallel. Output order matches input.
pub fn build_groups(
    groups: &[(String, Vec<TraceRecord>)],
    builder: &GraphBuilder,
) -> Vec<(String, ExecutionGraph)> {
    groups
        .par_iter()
        .map(|(correlation_id, records)| (correlation_id.clone(), builder.build(records)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct CountingSource {
        calls: Cell<usize>,
    }

    impl TraceSource for CountingSource {
        fn fetch(&self, _correlation_id: &str) -> Result<Vec<TraceRecord>> {
            self.calls.set(self.calls.get() + 1);
            Ok(vec![
                TraceRecord::new("root", "Foo.Root", "Create", 0, 0),
                TraceRecord::new("child", "Foo.Child", "Create", 1, 0),
            ])
        }
    }

    struct NullExporter;
    impl GraphExporter for NullExporter {
        fn export(&self, _graph: &ExecutionGraph, _path: &Path) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_cache_avoids_second_fetch() {
        let source = CountingSource { calls: Cell::new(0) };
        let cache = GraphCache::new(4);
        let usecase = BuildFlowUsecase {
            source: &source,
            exporter: &NullExporter,
            cache: Some(&cache),
            cache_key: None,
            builder: GraphBuilder::default(),
        };

        let first = usecase.run("c1", Path::new("unused.dot")).unwrap();
        let second = usecase.run("c1", Path::new("unused.dot")).unwrap();
        assert_eq!(source.calls.get(), 1);
        assert_eq!(first.edges.len(), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_cache_key_separates_entries() {
        let source = CountingSource { calls: Cell::new(0) };
        let cache = GraphCache::new(4);
        let scoped = |key: &str| BuildFlowUsecase {
            source: &source,
            exporter: &NullExporter,
            cache: Some(&cache),
            cache_key: Some(key.to_string()),
            builder: GraphBuilder::default(),
        };

        scoped("a.json#c1").graph("c1").unwrap();
        scoped("b.json#c1").graph("c1").unwrap();
        scoped("a.json#c1").graph("c1").unwrap();
        assert_eq!(source.calls.get(), 2);
        assert!(cache.get("a.json#c1").is_some());
        assert!(cache.get("c1").is_none());
    }

    #[test]
    fn test_build_groups_preserves_order() {
        let groups = vec![
            ("c1".to_string(), vec![TraceRecord::new("a", "Foo", "Create", 0, 0)]),
            ("c2".to_string(), vec![]),
        ];
        let graphs = build_groups(&groups, &GraphBuilder::default());
        assert_eq!(graphs[0].0, "c1");
        assert_eq!(graphs[0].1.nodes.len(), 1);
        assert!(graphs[1].1.is_empty());
    }
}
