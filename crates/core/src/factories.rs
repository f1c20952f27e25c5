//! Factories for generating instances of batchfetch modules.

use batchfetch_api::{
    fetch::DynFetcher, orchestrator::DynOrchestrator,
    orchestrator::DynOrchestratorFactory, progress::DynProgressReporter,
    Strategy,
};
use std::sync::Arc;

pub mod config;

pub mod core_sequential;
pub use core_sequential::CoreSequentialFactory;

pub mod core_fan_out;
pub use core_fan_out::CoreFanOutFactory;

pub mod core_bounded_queue;
pub use core_bounded_queue::CoreBoundedQueueFactory;

pub mod core_bounded_concurrency;
pub use core_bounded_concurrency::CoreBoundedConcurrencyFactory;

mod mem_fetcher;
pub use mem_fetcher::*;

mod mem_sink;
pub use mem_sink::*;

/// The core factory implementing `strategy`.
pub fn factory_for(strategy: Strategy) -> DynOrchestratorFactory {
    match strategy {
        Strategy::Sequential => CoreSequentialFactory::create(),
        Strategy::FanOut => CoreFanOutFactory::create(),
        Strategy::BoundedQueue => CoreBoundedQueueFactory::create(),
        Strategy::BoundedConcurrency => {
            CoreBoundedConcurrencyFactory::create()
        }
    }
}

/// Construct a core orchestrator directly, bypassing the builder.
///
/// The config is not validated here.
pub(crate) fn orchestrator_for(
    strategy: Strategy,
    config: config::BatchConfig,
    fetcher: DynFetcher,
    progress: Option<DynProgressReporter>,
) -> DynOrchestrator {
    match strategy {
        Strategy::Sequential => Arc::new(core_sequential::CoreSequential::new(
            fetcher, progress,
        )),
        Strategy::FanOut => Arc::new(core_fan_out::CoreFanOut::new(
            config, fetcher, progress,
        )),
        Strategy::BoundedQueue => {
            Arc::new(core_bounded_queue::CoreBoundedQueue::new(
                config, fetcher, progress,
            ))
        }
        Strategy::BoundedConcurrency => Arc::new(
            core_bounded_concurrency::CoreBoundedConcurrency::new(
                config, fetcher, progress,
            ),
        ),
    }
}
