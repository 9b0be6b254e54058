/// Benchmarks for the Traceflow graph pipeline.
///
/// Run with: `cargo bench`
///
/// Compares the exhaustive ancestor scan with the prefix-indexed scan at
/// correlation-group sizes from tens to low thousands of records.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use traceflow::domain::ancestry::InferenceStrategy;
use traceflow::domain::graph::{GraphBuilder, LayoutConfig};
use traceflow::TraceRecord;

// ═══════════════════════════════════════════════════════════════════════════
// Synthetic Data Generators
// ═══════════════════════════════════════════════════════════════════════════

/// Create a synthetic correlation group spread over a few namespaces.
fn create_synthetic_group(num_records: usize, namespaces: usize) -> Vec<TraceRecord> {
    (0..num_records)
        .map(|i| {
            let ns = i % namespaces;
            let depth = (i % 5) as u32;
            // Coarse timestamps so many records collide.
            let ts = (i / 3) as i64 * 10;
            TraceRecord::new(
                format!("rec-{}", i),
                format!("Ns{}.Plugins.Step{}", ns, i % 7),
                if i % 2 == 0 { "Create" } else { "Update" },
                depth,
                ts,
            )
        })
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════
// Benchmarks
// ═══════════════════════════════════════════════════════════════════════════

fn bench_build_graph(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_graph");

    for size in [50usize, 200, 1000, 4000] {
        let records = create_synthetic_group(size, 4);
        group.throughput(Throughput::Elements(size as u64));

        for strategy in [InferenceStrategy::Exhaustive, InferenceStrategy::PrefixIndexed] {
            let builder = GraphBuilder::new(LayoutConfig::default(), strategy);
            group.bench_with_input(
                BenchmarkId::new(format!("{:?}", strategy), size),
                &records,
                |b, records| b.iter(|| builder.build(black_box(records))),
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_build_graph);
criterion_main!(benches);
