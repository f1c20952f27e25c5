//! Batchfetch orchestrator types.

use crate::{
    builder, config, sink::DynSink, BatchResult, BfResult, BoxFut,
    CancellationSignal, Key, Strategy,
};
use std::sync::Arc;

/// Drives one fetch per key against a [crate::fetch::Fetcher] and
/// deposits the results into a sink.
///
/// Failures and cancellation are reported in the returned
/// [BatchResult], never as a panic or an early return.
pub trait Orchestrator: 'static + Send + Sync + std::fmt::Debug {
    /// The strategy this orchestrator implements.
    fn strategy(&self) -> Strategy;

    /// Run one batch over `keys`.
    ///
    /// The signal should be created for this batch only. If it is already
    /// cancelled, no fetch is issued and nothing is delivered.
    fn run(
        &self,
        keys: Vec<Key>,
        sink: DynSink,
        signal: CancellationSignal,
    ) -> BoxFut<'_, BatchResult>;
}

/// Trait-object [Orchestrator].
pub type DynOrchestrator = Arc<dyn Orchestrator>;

/// A factory for creating Orchestrator instances.
pub trait OrchestratorFactory: 'static + Send + Sync + std::fmt::Debug {
    /// Help the builder construct a default config from the chosen
    /// module factories.
    fn default_config(&self, config: &mut config::Config) -> BfResult<()>;

    /// Validate configuration.
    fn validate_config(&self, config: &config::Config) -> BfResult<()>;

    /// Construct an Orchestrator instance.
    fn create(
        &self,
        builder: Arc<builder::Builder>,
    ) -> BoxFut<'static, BfResult<DynOrchestrator>>;
}

/// Trait-object [OrchestratorFactory].
pub type DynOrchestratorFactory = Arc<dyn OrchestratorFactory>;
