// Command-line entry point for Traceflow.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use traceflow::api::server::{self, ServerState};
use traceflow::application::{build_groups, BuildFlowUsecase};
use traceflow::domain::ancestry::InferenceStrategy;
use traceflow::infrastructure::concurrency::init_thread_pool;
use traceflow::infrastructure::config::Settings;
use traceflow::infrastructure::{group_output_paths, ExportFormat, GraphCache, JsonFileTraceSource};
use traceflow::TraceflowError;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON file holding an array of trace records
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Correlation id to build (defaults to the first group in the file)
    #[arg(short, long)]
    correlation: Option<String>,

    /// Build every correlation group; --output is then a directory
    #[arg(long)]
    all: bool,

    /// Output file path (or directory with --all)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format (dot, json)
    #[arg(short, long, default_value = "dot")]
    format: String,

    /// Settings file
    #[arg(long, default_value = "traceflow.toml")]
    config: PathBuf,

    /// Ancestor search strategy (exhaustive, prefix-indexed); overrides the settings file
    #[arg(long)]
    strategy: Option<String>,

    /// Run the JSON-lines API server instead of a one-shot build
    #[arg(long)]
    serve: bool,

    /// Server port; overrides the settings file
    #[arg(short, long)]
    port: Option<u16>,

    /// Worker threads for --all (default: half the cores)
    #[arg(long)]
    threads: Option<usize>,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "traceflow=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut settings = Settings::load(&cli.config)?;
    if let Some(name) = &cli.strategy {
        settings.inference.strategy = InferenceStrategy::from_name(name)
            .ok_or_else(|| TraceflowError::UnknownStrategy(name.clone()))?;
    }
    let builder = settings.graph_builder();

    if cli.serve {
        let port = cli.port.unwrap_or(settings.server.port);
        return server::start_server(
            port,
            ServerState {
                builder,
                cache: GraphCache::new(settings.cache.capacity),
            },
        );
    }

    let Some(input) = &cli.input else {
        bail!("Please provide --input <file> or --serve");
    };
    let format = ExportFormat::parse(&cli.format)?;
    let source = JsonFileTraceSource::open(input)?;

    if cli.all {
        init_thread_pool(cli.threads)?;
        let out_dir = cli.output.clone().unwrap_or_else(|| PathBuf::from("flows"));
        fs::create_dir_all(&out_dir)
            .with_context(|| format!("Failed to create {}", out_dir.display()))?;

        let groups = source.group_by_correlation();
        let graphs = build_groups(&groups, &builder);
        let ids: Vec<&str> = graphs.iter().map(|(id, _)| id.as_str()).collect();
        let paths = group_output_paths(&out_dir, &ids, format);
        for ((correlation_id, graph), path) in graphs.iter().zip(&paths) {
            format.exporter().export(graph, path)?;
            tracing::info!(
                correlation_id = %correlation_id,
                nodes = graph.nodes.len(),
                edges = graph.edges.len(),
                path = %path.display(),
                "exported graph"
            );
        }
        println!("Built {} correlation groups into {}", graphs.len(), out_dir.display());
        return Ok(());
    }

    let correlation_id = match &cli.correlation {
        Some(id) => id.clone(),
        None => source
            .group_by_correlation()
            .into_iter()
            .next()
            .map(|(id, _)| id)
            .unwrap_or_default(),
    };
    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("flow.{}", format.extension())));

    let usecase = BuildFlowUsecase {
        source: &source,
        exporter: format.exporter(),
        cache: None,
        cache_key: None,
        builder,
    };
    let graph = usecase.run(&correlation_id, &output)?;

    println!(
        "Graph completed! {} nodes, {} edges, {} lanes written to {}",
        graph.nodes.len(),
        graph.edges.len(),
        graph.lane_count,
        output.display()
    );
    Ok(())
}
