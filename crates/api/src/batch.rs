//! The result of one batch invocation.

use crate::{BfError, BfResult, Entity};

/// Everything that happened during one batch.
///
/// Produced exactly once per batch and owned by the caller.
///
/// Note that `entities` is not necessarily everything the sink has seen.
/// The sequential strategy aborts on the first failure and returns no
/// entities even though earlier ones were already delivered. Callers that
/// render results should render what reached the sink, whatever this
/// result reports.
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    /// The entities delivered during this batch, in delivery order.
    pub entities: Vec<Entity>,

    /// The errors recorded during this batch, in the order the failing
    /// attempts completed.
    pub errors: Vec<BfError>,

    /// True if the batch observed its cancellation signal.
    pub cancelled: bool,
}

impl BatchResult {
    /// A batch that was cancelled before anything happened.
    pub fn cancelled() -> Self {
        Self {
            cancelled: true,
            ..Default::default()
        }
    }

    /// True if the batch ran to completion without errors.
    pub fn is_complete(&self) -> bool {
        !self.cancelled && self.errors.is_empty()
    }

    /// Collapse this batch into a single top-level result.
    ///
    /// - A cancelled batch is [BfError::Cancelled], even if errors
    ///   were recorded before the cancellation was observed.
    /// - A single error is returned as is.
    /// - Multiple errors are returned as [BfError::Aggregate].
    pub fn into_result(self) -> BfResult<Vec<Entity>> {
        if self.cancelled {
            return Err(BfError::Cancelled);
        }
        match BfError::aggregate(self.errors) {
            Some(err) => Err(err),
            None => Ok(self.entities),
        }
    }
}
