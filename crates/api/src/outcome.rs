//! The outcome of a single fetch attempt.

use crate::{BfError, BfResult, Entity};

/// What happened to one fetch attempt. Exactly one per attempt.
///
/// Orchestrators match this exhaustively, there is no way to register
/// interest in only one variant and silently lose the others.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// The fetch produced an entity.
    Success(Entity),

    /// The fetch failed.
    Failure(BfError),

    /// The fetch observed the cancellation signal and stopped.
    Cancelled,
}

impl FetchOutcome {
    /// True for [FetchOutcome::Success].
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

impl From<BfResult<Entity>> for FetchOutcome {
    fn from(value: BfResult<Entity>) -> Self {
        match value {
            Ok(entity) => Self::Success(entity),
            Err(BfError::Cancelled) => Self::Cancelled,
            Err(err) => Self::Failure(err),
        }
    }
}
