//! The binary batchfetch-showcase.
//!
//! Loads the person directory from a simulated slow service using one of
//! the orchestration strategies, printing people as they arrive.

use batchfetch_api::{
    builder::Builder, config::Config, fetch::DynFetcher, sink::DynSink,
    BfError, BfResult, CancellationSignal, Key, Strategy,
};
use batchfetch_core::{
    builder_for,
    factories::{config::BatchModConfig, AffinitySink, MemFetcher},
    fetch_all,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

mod console;
mod person;

/// Batchfetch showcase: load a person directory concurrently.
#[derive(clap::Parser, Debug)]
#[command(version)]
struct Args {
    /// The orchestration strategy: sequential, fan-out, bounded-queue or
    /// bounded-concurrency.
    #[arg(long, default_value = "bounded-concurrency")]
    strategy: Strategy,

    /// Load module configuration from this JSON file. Command line flags
    /// override it.
    #[arg(long)]
    config: Option<std::path::PathBuf>,

    /// Maximum fetches in flight for bounded-concurrency.
    #[arg(long)]
    max_concurrency: Option<usize>,

    /// Lift the bounded-concurrency limit entirely.
    #[arg(long, conflicts_with = "max_concurrency")]
    unbounded: bool,

    /// Capacity of the bounded-queue strategy's queue.
    #[arg(long)]
    queue_capacity: Option<usize>,

    /// Silently drop failed fetches (legacy behavior).
    #[arg(long)]
    drop_failures: bool,

    /// Simulated latency of every fetch.
    #[arg(long, default_value_t = 500)]
    latency_ms: u64,

    /// Make fetching these person ids fail with a transport error.
    #[arg(long, value_delimiter = ',')]
    fail: Vec<i64>,

    /// Cancel the batch after this many milliseconds.
    #[arg(long)]
    cancel_after_ms: Option<u64>,

    /// Deliver every person on a dedicated display thread.
    #[arg(long)]
    affinity: bool,
}

fn load_config(args: &Args, builder: &mut Builder) -> BfResult<()> {
    let mut module: BatchModConfig = match &args.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path).map_err(|err| {
                BfError::other_src(
                    format!("reading {}", path.display()),
                    err,
                )
            })?;
            let file: Config = serde_json::from_str(&raw).map_err(|err| {
                BfError::other_src(
                    format!("parsing {}", path.display()),
                    err,
                )
            })?;
            file.get_module_config()?
        }
        None => builder.config.get_module_config()?,
    };

    if args.unbounded {
        module.batch.max_concurrency = None;
    } else if let Some(max) = args.max_concurrency {
        module.batch.max_concurrency = Some(max);
    }
    if let Some(capacity) = args.queue_capacity {
        module.batch.queue_capacity = capacity;
    }
    if args.drop_failures {
        module.batch.drop_failures = true;
    }

    builder.config.set_module_config(&module)?;
    builder.validate_config()
}

async fn run(args: Args) -> BfResult<bool> {
    let fetcher = MemFetcher::new(Duration::from_millis(args.latency_ms));
    for person in person::directory() {
        fetcher.insert(person.key(), person.encode()?);
    }
    for id in &args.fail {
        fetcher.fail_with_status(Key(*id), 500);
    }
    let fetcher: DynFetcher = Arc::new(fetcher);

    let mut builder = builder_for(args.strategy, fetcher.clone());
    builder.set_default_config()?;
    load_config(&args, &mut builder)?;
    builder.progress = Some(Arc::new(console::ConsoleProgress::default()));

    tracing::debug!(config = ?builder.config, "starting showcase");
    let orchestrator = builder.build().await?;

    let signal = CancellationSignal::new();
    ctrlc::set_handler({
        let signal = signal.clone();
        move || signal.signal()
    })
    .map_err(|err| {
        BfError::other_src("installing ctrl-c handler", err)
    })?;
    if let Some(ms) = args.cancel_after_ms {
        signal.cancel_after(Duration::from_millis(ms));
    }

    let affinity = if args.affinity {
        Some(AffinitySink::create(Arc::new(console::ConsoleSink))?)
    } else {
        None
    };
    let sink: DynSink = match &affinity {
        Some(affinity) => affinity.clone(),
        None => Arc::new(console::ConsoleSink),
    };

    println!(
        "Loading people with the {} strategy (ctrl-c to cancel)",
        orchestrator.strategy()
    );
    let start = Instant::now();

    let result = fetch_all(&orchestrator, &fetcher, sink, signal).await?;

    if let Some(affinity) = affinity {
        affinity.flush().await;
    }

    let elapsed = start.elapsed();
    println!();
    if result.cancelled {
        println!("The operation was cancelled");
    }
    for err in &result.errors {
        println!("ERROR: {err}");
    }
    println!(
        "{} people loaded, {} failed, total time: {:.3}s",
        result.entities.len(),
        result.errors.len(),
        elapsed.as_secs_f64(),
    );

    Ok(result.is_complete())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(tracing::Level::WARN.into())
                .from_env_lossy(),
        )
        .init();

    let args = <Args as clap::Parser>::parse();

    match run(args).await {
        Ok(true) => (),
        Ok(false) => std::process::exit(2),
        Err(err) => {
            eprintln!("batchfetch-showcase: {err}");
            std::process::exit(1);
        }
    }
}
