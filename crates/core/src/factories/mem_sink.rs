//! In-memory sink implementations provided by batchfetch.

use batchfetch_api::{
    sink::{AffinityCallback, DynSink, Sink},
    BfError, BfResult, Entity,
};
use std::sync::{Arc, Mutex};
use std::thread::ThreadId;
use tokio::sync::{mpsc, oneshot};

#[cfg(test)]
pub(crate) mod test;

/// Collects delivered entities in memory, in delivery order.
///
/// Safe for concurrent writers.
#[derive(Debug, Default)]
pub struct MemSink(Mutex<Vec<Entity>>);

impl MemSink {
    /// Construct a new, empty MemSink.
    pub fn create() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Everything delivered so far.
    pub fn entities(&self) -> Vec<Entity> {
        self.0.lock().unwrap().clone()
    }

    /// The number of entities delivered so far.
    pub fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }

    /// True if nothing has been delivered yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Sink for MemSink {
    fn deliver(&self, entity: Entity) {
        self.0.lock().unwrap().push(entity);
    }
}

/// Wraps a sink so that it is only ever touched from one dedicated
/// thread, the way a UI toolkit requires all widget updates to happen on
/// its UI thread.
///
/// The thread is spawned on construction and exits once the
/// AffinitySink is dropped and all queued callbacks have run.
#[derive(Debug)]
pub struct AffinitySink {
    inner: DynSink,
    queue: mpsc::UnboundedSender<AffinityCallback>,
    thread_id: ThreadId,
}

impl AffinitySink {
    /// Spawn the affinity thread and wrap `inner`.
    pub fn create(inner: DynSink) -> BfResult<Arc<Self>> {
        let (queue, mut queue_rx) = mpsc::unbounded_channel::<AffinityCallback>();
        let thread = std::thread::Builder::new()
            .name("batchfetch-affinity".to_string())
            .spawn(move || {
                while let Some(callback) = queue_rx.blocking_recv() {
                    callback();
                }
                tracing::debug!("affinity thread exiting");
            })
            .map_err(|err| {
                BfError::other_src("could not spawn affinity thread", err)
            })?;

        Ok(Arc::new(Self {
            inner,
            queue,
            thread_id: thread.thread().id(),
        }))
    }

    /// The id of the affinity thread.
    pub fn thread_id(&self) -> ThreadId {
        self.thread_id
    }

    /// Resolves once every callback queued before this call has run.
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        self.run_on_affinity_thread(Box::new(move || {
            let _ = tx.send(());
        }));
        let _ = rx.await;
    }
}

impl Sink for AffinitySink {
    fn deliver(&self, entity: Entity) {
        if std::thread::current().id() != self.thread_id {
            tracing::warn!(
                key = %entity.key,
                "delivery outside of the affinity thread"
            );
        }
        self.inner.deliver(entity);
    }

    fn requires_affinity(&self) -> bool {
        true
    }

    fn run_on_affinity_thread(&self, callback: AffinityCallback) {
        if self.queue.send(callback).is_err() {
            tracing::warn!("affinity thread is gone, dropping callback");
        }
    }
}
