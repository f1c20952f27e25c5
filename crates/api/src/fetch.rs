//! Batchfetch fetch collaborator types.

use crate::{BfResult, BoxFut, CancellationSignal, Entity, Key};
use std::sync::Arc;

/// The data source orchestrators fetch from.
///
/// The transport and deserialization behind it are entirely up to the
/// implementation. Implementations should honour the cancellation signal
/// where they can by returning [crate::BfError::Cancelled], but the
/// orchestrators do not depend on it: they stop waiting on a fetch once
/// they observe cancellation themselves.
#[cfg_attr(any(test, feature = "mockall"), mockall::automock)]
pub trait Fetcher: 'static + Send + Sync + std::fmt::Debug {
    /// Retrieve the list of keys available from this source.
    fn fetch_keys(
        &self,
        signal: CancellationSignal,
    ) -> BoxFut<'_, BfResult<Vec<Key>>>;

    /// Retrieve a single entity.
    ///
    /// Fails with [crate::BfError::Transport],
    /// [crate::BfError::Deserialization] or [crate::BfError::NotFound].
    fn fetch_one(
        &self,
        key: Key,
        signal: CancellationSignal,
    ) -> BoxFut<'_, BfResult<Entity>>;
}

/// Trait-object [Fetcher].
pub type DynFetcher = Arc<dyn Fetcher>;
