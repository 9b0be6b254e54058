/// Concurrency management for Traceflow.
/// Sizes the rayon pool used when building many correlation groups at once.

use anyhow::Result;

/// Worker count used when none is requested: half the cores, minimum 1.
pub fn default_workers() -> usize {
    std::cmp::max(1, num_cpus::get() / 2)
}

/// Initialize the global rayon thread pool.
pub fn init_thread_pool(workers: Option<usize>) -> Result<usize> {
    let workers = workers.filter(|w| *w > 0).unwrap_or_else(default_workers);

    rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build_global()?;

    tracing::info!(workers, cores = num_cpus::get(), "initialized thread pool");
    Ok(workers)
}
