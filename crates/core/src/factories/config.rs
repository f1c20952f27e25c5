//! Orchestrator configuration types.

use batchfetch_api::{config::ModConfig, BfError, BfResult};

/// Configuration parameters shared by the core orchestrators.
///
/// Parameters only apply to the strategies that use them.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BatchConfig {
    /// Silently drop failed fetches instead of recording them in the
    /// batch result. This is the legacy behaviour of success-only
    /// completion handlers and should only be enabled for compatibility.
    /// Ignored by the sequential strategy, which always aborts on the
    /// first failure. Default: false.
    pub drop_failures: bool,

    /// The maximum number of fetches in flight for the
    /// bounded-concurrency strategy. `None` (`null`) is unbounded.
    /// Default: 10.
    pub max_concurrency: Option<usize>,

    /// The capacity of the bounded queue strategy's queue. Default: 10.
    pub queue_capacity: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            drop_failures: false,
            max_concurrency: Some(10),
            queue_capacity: 10,
        }
    }
}

impl BatchConfig {
    /// Reject configurations no orchestrator can run with.
    pub fn validate(&self) -> BfResult<()> {
        if self.max_concurrency == Some(0) {
            return Err(BfError::other(
                "maxConcurrency must be at least 1, use null for unbounded",
            ));
        }
        if self.queue_capacity == 0 {
            return Err(BfError::other("queueCapacity must be at least 1"));
        }
        Ok(())
    }
}

/// Module-level configuration for the core orchestrators.
#[derive(
    Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "camelCase", default)]
pub struct BatchModConfig {
    /// Orchestrator configuration.
    pub batch: BatchConfig,
}

impl ModConfig for BatchModConfig {}
