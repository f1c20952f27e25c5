//! The fan-out/fan-in orchestrator.
//!
//! Every key gets its own fetch task, all of them spawned up front with no
//! throttling. Each task handles its own completion: a success is
//! delivered to the sink straight from the task, a failure is recorded
//! (or dropped, see [BatchConfig::drop_failures]). The orchestrator then
//! joins all tasks.
//!
//! - Deliveries happen concurrently from many tasks, in completion order.
//!   Sinks that are not safe for concurrent writers are serialized,
//!   sinks with thread affinity get every delivery dispatched to their
//!   affinity thread.
//! - Errors are recorded in completion order, not key order.
//! - Once cancellation is observed the join is abandoned. Tasks still
//!   running are left to finish in the background and deliver nothing.
//!
//! [BatchConfig::drop_failures]: super::config::BatchConfig::drop_failures

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

/// The fan-out/fan-in orchestrator factory.
#[derive(Debug)]
pub struct CoreFanOutFactory {}

impl CoreFanOutFactory {
    /// Construct a new CoreFanOutFactory.
    pub fn create() -> DynOrchestratorFactory {
        Arc::new(Self {})
    }
}

impl OrchestratorFactory for CoreFanOutFactory {
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
            let out: DynOrchestrator = Arc::new(CoreFanOut::new(
                config.batch,
                builder.fetcher.clone(),
                builder.progress.clone(),
            ));
            Ok(out)
        })
    }
}

#[derive(Debug)]
pub(crate) struct CoreFanOut {
    config: BatchConfig,
    fetcher: DynFetcher,
    progress: Option<DynProgressReporter>,
}

impl CoreFanOut {
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

        tracing::debug!(keys = keys.len(), "fan-out batch start");

        let state = BatchState::new(
            sink,
            signal,
            self.config.drop_failures,
            self.progress.clone(),
            keys.len(),
        );

        let tasks = keys
            .into_iter()
            .map(|key| {
                tokio::task::spawn(run_attempt(
                    self.fetcher.clone(),
                    key,
                    state.clone(),
                    None,
                ))
            })
            .collect::<Vec<_>>();

        let cancelled = join_or_cancel(tasks, &state).await;
        state.finish(cancelled).await
    }
}

impl Orchestrator for CoreFanOut {
    fn strategy(&self) -> Strategy {
        Strategy::FanOut
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
