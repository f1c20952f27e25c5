#![deny(missing_docs)]
//! Batch fetch orchestration.
//!
//! Retrieve many independent entities from a slow, fallible source and
//! stream them into a [batchfetch_api::sink::Sink] while they arrive.
//! Four orchestration strategies are provided, see [factories]:
//!
//! - sequential, one fetch at a time in key order,
//! - fan-out/fan-in, every fetch in flight at once,
//! - bounded queue, producers and a single consumer joined by a
//!   fixed-capacity queue,
//! - bounded concurrency, at most K fetches in flight.
//!
//! Every strategy honours a shared [CancellationSignal] and reports a
//! [BatchResult] instead of failing: the only error surfaced at the top
//! level is an invalid configuration (or a failed key listing for
//! [fetch_all]).

use batchfetch_api::{
    builder::Builder, config::Config, fetch::DynFetcher,
    orchestrator::DynOrchestrator, sink::DynSink, BatchResult, BfResult,
    CancellationSignal, Key, Strategy,
};

pub mod factories;

mod common;

/// Construct a default builder using `fetcher`.
///
/// - `orchestrator` - The default orchestrator is
///   [factories::CoreBoundedConcurrencyFactory].
/// - `progress` - No progress is reported by default.
pub fn default_builder(fetcher: DynFetcher) -> Builder {
    builder_for(Strategy::BoundedConcurrency, fetcher)
}

/// Construct a builder running `strategy` with `fetcher`.
pub fn builder_for(strategy: Strategy, fetcher: DynFetcher) -> Builder {
    Builder {
        config: Config::default(),
        fetcher,
        orchestrator: factories::factory_for(strategy),
        progress: None,
    }
}

/// Run one batch over `keys` with the given strategy and configuration.
///
/// Returns an error only if `config` is invalid. Fetch failures and
/// cancellation are reported in the [BatchResult].
pub async fn run(
    strategy: Strategy,
    fetcher: DynFetcher,
    keys: Vec<Key>,
    sink: DynSink,
    signal: CancellationSignal,
    config: factories::config::BatchConfig,
) -> BfResult<BatchResult> {
    config.validate()?;
    let orchestrator =
        factories::orchestrator_for(strategy, config, fetcher, None);
    Ok(orchestrator.run(keys, sink, signal).await)
}

/// List every key `fetcher` knows about, then run `orchestrator` over
/// them.
///
/// A failed key listing is returned as an error. A key listing that is
/// interrupted by the signal yields a cancelled, empty batch.
pub async fn fetch_all(
    orchestrator: &DynOrchestrator,
    fetcher: &DynFetcher,
    sink: DynSink,
    signal: CancellationSignal,
) -> BfResult<BatchResult> {
    let keys = match fetcher.fetch_keys(signal.clone()).await {
        Ok(keys) => keys,
        Err(err) if err.is_cancelled() || signal.is_cancelled() => {
            return Ok(BatchResult::cancelled());
        }
        Err(err) => {
            tracing::warn!("unable to list keys: {err}");
            return Err(err);
        }
    };

    tracing::debug!(
        keys = keys.len(),
        strategy = %orchestrator.strategy(),
        "fetching all keys"
    );

    Ok(orchestrator.run(keys, sink, signal).await)
}
