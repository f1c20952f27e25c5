//! Builder-related types.

use crate::*;
use std::sync::Arc;

/// The general batchfetch builder.
/// This contains both configuration and collaborator instances,
/// allowing construction of runtime orchestrator instances.
#[derive(Debug)]
pub struct Builder {
    /// The module configuration to be used when building modules.
    /// This can be loaded from disk or modified before freezing the builder.
    pub config: config::Config,

    /// The [fetch::Fetcher] every orchestrator built from this builder
    /// fetches from. There is no global fetcher: whatever is set here is
    /// what gets used.
    pub fetcher: fetch::DynFetcher,

    /// The [orchestrator::OrchestratorFactory] to be used for creating
    /// [orchestrator::Orchestrator] instances.
    pub orchestrator: orchestrator::DynOrchestratorFactory,

    /// An optional [progress::ProgressReporter] that orchestrators
    /// report to as attempts complete.
    pub progress: Option<progress::DynProgressReporter>,
}

impl Builder {
    /// Construct a default config given the configured module factories.
    /// Note, this should be called before freezing the Builder instance
    /// in an Arc<>.
    pub fn set_default_config(&mut self) -> BfResult<()> {
        let Self {
            config,
            fetcher: _,
            orchestrator,
            progress: _,
        } = self;

        orchestrator.default_config(config)?;

        Ok(())
    }

    /// Chaining variant of [Builder::set_default_config].
    pub fn with_default_config(mut self) -> BfResult<Self> {
        self.set_default_config()?;
        Ok(self)
    }

    /// Validate the current configuration with every module factory.
    pub fn validate_config(&self) -> BfResult<()> {
        self.orchestrator.validate_config(&self.config)
    }

    /// Freeze this builder and generate an orchestrator instance.
    pub async fn build(self) -> BfResult<orchestrator::DynOrchestrator> {
        self.validate_config()?;
        let builder = Arc::new(self);
        builder.orchestrator.create(builder.clone()).await
    }
}
