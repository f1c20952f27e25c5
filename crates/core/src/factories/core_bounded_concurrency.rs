//! The bounded concurrency orchestrator.
//!
//! Fetch tasks are issued in key order, but at most
//! [BatchConfig::max_concurrency] of them are in flight at any instant.
//! Admission is gated by a semaphore: a task acquires a permit before it
//! is spawned and releases it as soon as its fetch is terminal, so the
//! next key is admitted without waiting for the delivery.
//!
//! With `max_concurrency` set to `None` there is no gate, and the
//! behavior is that of the fan-out strategy with in-order issuance.
//!
//! Cancellation observed while issuing stops issuing immediately. Attempts
//! already admitted are not awaited, and nothing they produce afterwards
//! is recorded.
//!
//! [BatchConfig::max_concurrency]: super::config::BatchConfig::max_concurrency

use super::config::{BatchConfig, BatchModConfig};
use crate::common::{join_or_cancel, run_attempt, BatchState};
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
    BatchResult, BfResult, BoxFut, CancellationSignal, Key, Strategy,
};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// The bounded concurrency orchestrator factory.
#[derive(Debug)]
pub struct CoreBoundedConcurrencyFactory {}

impl CoreBoundedConcurrencyFactory {
    /// Construct a new CoreBoundedConcurrencyFactory.
    pub fn create() -> DynOrchestratorFactory {
        Arc::new(Self {})
    }
}

impl OrchestratorFactory for CoreBoundedConcurrencyFactory {
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
            let config: BatchModConfig = builder.config.get_module_config()?;
            let out: DynOrchestrator = Arc::new(CoreBoundedConcurrency::new(
                config.batch,
                builder.fetcher.clone(),
                builder.progress.clone(),
            ));
            Ok(out)
        })
    }
}

#[derive(Debug)]
pub(crate) struct CoreBoundedConcurrency {
    config: BatchConfig,
    fetcher: DynFetcher,
    progress: Option<DynProgressReporter>,
}

impl CoreBoundedConcurrency {
    pub(crate) fn new(
        config: BatchConfig,
        fetcher: DynFetcher,
        progress: Option<DynProgressReporter>,
    ) -> Self {
        Self {
            config,
            fetcher,
            progress,
        }
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

        tracing::debug!(
            keys = keys.len(),
            max_concurrency = ?self.config.max_concurrency,
            "bounded concurrency batch start"
        );

        let gate = self
            .config
            .max_concurrency
            .map(|limit| Arc::new(Semaphore::new(limit)));

        let state = BatchState::new(
            sink,
            signal.clone(),
            self.config.drop_failures,
            self.progress.clone(),
            keys.len(),
        );

        let mut tasks = Vec::with_capacity(keys.len());
        for key in keys {
            if signal.is_cancelled() {
                return state.finish(true).await;
            }

            let permit = match &gate {
                Some(gate) => match Self::admit(gate.clone(), &signal).await {
                    Some(permit) => Some(permit),
                    None => return state.finish(true).await,
                },
                None => None,
            };

            // The signal may have flipped while waiting for a slot.
            if signal.is_cancelled() {
                return state.finish(true).await;
            }

            tasks.push(tokio::task::spawn(run_attempt(
                self.fetcher.clone(),
                key,
                state.clone(),
                permit,
            )));
        }

        let cancelled = join_or_cancel(tasks, &state).await;
        state.finish(cancelled).await
    }

    /// Wait for a free slot. Returns `None` if the batch is cancelled
    /// first.
    async fn admit(
        gate: Arc<Semaphore>,
        signal: &CancellationSignal,
    ) -> Option<OwnedSemaphorePermit> {
        tokio::select! {
            biased;
            _ = signal.cancelled() => None,
            permit = gate.acquire_owned() => permit.ok(),
        }
    }
}

impl Orchestrator for CoreBoundedConcurrency {
    fn strategy(&self) -> Strategy {
        Strategy::BoundedConcurrency
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
