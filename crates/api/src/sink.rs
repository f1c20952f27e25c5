//! Batchfetch result sink types.

use crate::Entity;
use std::sync::Arc;

/// A callback that must run on a sink's affinity thread.
pub type AffinityCallback = Box<dyn FnOnce() + 'static + Send>;

/// The destination for completed entities.
///
/// Concurrent orchestrators may call [Sink::deliver] from many tasks at
/// once. A sink that cannot cope with that returns `false` from
/// [Sink::is_concurrent_safe] and the orchestrators will serialize every
/// delivery behind a critical section.
///
/// A sink that must only be touched from one designated thread (a UI,
/// for example) returns `true` from [Sink::requires_affinity]. Every
/// delivery is then wrapped in a callback and handed to
/// [Sink::run_on_affinity_thread]. Callbacks for different entities may
/// be queued in any order.
pub trait Sink: 'static + Send + Sync + std::fmt::Debug {
    /// Accept one completed entity.
    fn deliver(&self, entity: Entity);

    /// Whether concurrent calls to [Sink::deliver] are safe.
    fn is_concurrent_safe(&self) -> bool {
        true
    }

    /// Whether deliveries must be dispatched via
    /// [Sink::run_on_affinity_thread].
    fn requires_affinity(&self) -> bool {
        false
    }

    /// Run `callback` on the affinity thread. The default runs it inline,
    /// which is only correct for sinks without affinity.
    fn run_on_affinity_thread(&self, callback: AffinityCallback) {
        callback()
    }
}

/// Trait-object [Sink].
pub type DynSink = Arc<dyn Sink>;
