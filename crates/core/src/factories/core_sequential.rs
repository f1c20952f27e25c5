//! The sequential orchestrator.
//!
//! This is the baseline all other strategies are compared against. Keys
//! are fetched one at a time, in input order, each fetch awaited to
//! completion before the next one is issued:
//!
//! `Idle → Fetching(i) → Delivered(i) → Fetching(i + 1) → … → Done`
//!
//! with `Cancelled` and `Failed` as the other terminal states.
//!
//! - The signal is checked before each fetch and again after it returns.
//!   While a fetch is in flight the orchestrator waits on both the fetch
//!   and the signal, so a cancellation does not wait for a slow fetch.
//! - The first failure aborts the batch. The result then holds only that
//!   error and no entities, although the entities fetched before the
//!   failure have already been delivered to the sink.

use super::config::BatchModConfig;
use crate::common::{fetch_outcome, BatchState};
use batchfetch_api::{
    builder::Builder,
    config::Config,
    fetch::DynFetcher,
    orchestrator::{
        DynOrchestrator, DynOrchestratorFactory, Orchestrator,
        OrchestratorFactory,
    },
    progress::DynProgressReporter,
    sink::DynSink,
    BatchResult, BfError, BfResult, BoxFut, CancellationSignal,
    FetchOutcome, Key, Strategy,
};
use std::sync::Arc;

/// The sequential orchestrator factory.
#[derive(Debug)]
pub struct CoreSequentialFactory {}

impl CoreSequentialFactory {
    /// Construct a new CoreSequentialFactory.
    pub fn create() -> DynOrchestratorFactory {
        Arc::new(Self {})
    }
}

impl OrchestratorFactory for CoreSequentialFactory {
    fn default_config(&self, config: &mut Config) -> BfResult<()> {
        config.set_default_module_config(&BatchModConfig::default())
    }

    fn validate_config(&self, config: &Config) -> BfResult<()> {
        config.get_module_config::<BatchModConfig>()?.batch.validate()
    }

    fn create(
        &self,
        builder: Arc<Builder>,
    ) -> BoxFut<'static, BfResult<DynOrchestrator>> {
        Box::pin(async move {
            let out: DynOrchestrator = Arc::new(CoreSequential::new(
                builder.fetcher.clone(),
                builder.progress.clone(),
            ));
            Ok(out)
        })
    }
}

#[derive(Debug)]
pub(crate) struct CoreSequential {
    fetcher: DynFetcher,
    progress: Option<DynProgressReporter>,
}

impl CoreSequential {
    pub(crate) fn new(
        fetcher: DynFetcher,
        progress: Option<DynProgressReporter>,
    ) -> Self {
        Self { fetcher, progress }
    }

    async fn run_inner(
        &self,
        keys: Vec<Key>,
        sink: DynSink,
        signal: CancellationSignal,
    ) -> BatchResult {
        if signal.is_cancelled() {
            return BatchResult::cancelled();
        }

        tracing::debug!(keys = keys.len(), "sequential batch start");

        let state = BatchState::new(
            sink,
            signal.clone(),
            false,
            self.progress.clone(),
            keys.len(),
        );

        for key in keys {
            if signal.is_cancelled() {
                return state.finish(true).await;
            }

            let task = tokio::task::spawn({
                let fetcher = self.fetcher.clone();
                let signal = signal.clone();
                async move { fetch_outcome(&fetcher, key, &signal).await }
            });

            let outcome = tokio::select! {
                biased;
                _ = signal.cancelled() => return state.finish(true).await,
                outcome = task => outcome.unwrap_or_else(|err| {
                    FetchOutcome::Failure(BfError::other_src(
                        "fetch task failed",
                        err,
                    ))
                }),
            };
            state.complete_attempt();

            if signal.is_cancelled() {
                return state.finish(true).await;
            }

            match outcome {
                FetchOutcome::Success(entity) => {
                    state.deliver(entity).await;
                }
                FetchOutcome::Failure(err) => {
                    tracing::warn!(
                        "aborting sequential batch, fetch for key {key} failed: {err}"
                    );
                    return state.abort(err).await;
                }
                FetchOutcome::Cancelled => return state.finish(true).await,
            }
        }

        state.finish(false).await
    }
}

impl Orchestrator for CoreSequential {
    fn strategy(&self) -> Strategy {
        Strategy::Sequential
    }

    fn run(
        &self,
        keys: Vec<Key>,
        sink: DynSink,
        signal: CancellationSignal,
    ) -> BoxFut<'_, BatchResult> {
        Box::pin(self.run_inner(keys, sink, signal))
    }
}

#[cfg(test)]
mod test;
