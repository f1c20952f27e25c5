//! The bounded queue pipeline orchestrator.
//!
//! Two roles decoupled by a fixed-capacity FIFO queue:
//!
//! - Producers: one task per key, all spawned up front. A producer fetches
//!   its key and writes the entity into the queue. If the queue is full
//!   the producer suspends until the consumer makes room (backpressure).
//!   A producer waiting on a full queue stays cancellable: on cancellation
//!   it abandons the write and discards its entity. A failed fetch is
//!   never written to the queue.
//! - Consumer: a single task draining the queue into the sink, in queue
//!   order, until the queue is marked complete.
//!
//! Completion protocol:
//!
//! - Join every producer (each has finished its write, or given up).
//! - Mark the queue complete. This is the consumer's only termination
//!   signal, and marking it more than once is harmless.
//! - Wait for the consumer to drain the queue.
//!
//! Delivery order is queue-write order, which is producer completion
//! order, not key order. The queue never holds more than
//! [BatchConfig::queue_capacity] entities.
//!
//! [BatchConfig::queue_capacity]: super::config::BatchConfig::queue_capacity

use super::config::{BatchConfig, BatchModConfig};
use crate::common::{fetch_outcome, join_or_cancel, BatchState};
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
    BatchResult, BfResult, BoxFut, CancellationSignal, Entity,
    FetchOutcome, Key, Strategy,
};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use tokio::sync::mpsc::{channel, Receiver, Sender};

/// The bounded queue orchestrator factory.
#[derive(Debug)]
pub struct CoreBoundedQueueFactory {}

impl CoreBoundedQueueFactory {
    /// Construct a new CoreBoundedQueueFactory.
    pub fn create() -> DynOrchestratorFactory {
        Arc::new(Self {})
    }
}

impl OrchestratorFactory for CoreBoundedQueueFactory {
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
            let out: DynOrchestrator = Arc::new(CoreBoundedQueue::new(
                config.batch,
                builder.fetcher.clone(),
                builder.progress.clone(),
            ));
            Ok(out)
        })
    }
}

/// The writing side of the entity queue.
///
/// Each producer holds a clone of the sender. The orchestrator holds one
/// more, and dropping it after all producers are joined is what marks the
/// queue complete.
#[derive(Debug)]
struct EntityQueue {
    tx: Option<Sender<Entity>>,
    capacity: usize,
    peak_occupancy: Arc<AtomicUsize>,
}

impl EntityQueue {
    fn new(
        capacity: usize,
        peak_occupancy: Arc<AtomicUsize>,
    ) -> (Self, Receiver<Entity>) {
        let (tx, rx) = channel(capacity);
        (
            Self {
                tx: Some(tx),
                capacity,
                peak_occupancy,
            },
            rx,
        )
    }

    fn writer(&self) -> Option<QueueWriter> {
        self.tx.as_ref().map(|tx| QueueWriter {
            tx: tx.clone(),
            capacity: self.capacity,
            peak_occupancy: self.peak_occupancy.clone(),
        })
    }

    /// No more writes will follow. Idempotent.
    fn mark_complete(&mut self) {
        if self.tx.take().is_some() {
            tracing::trace!("entity queue marked complete");
        }
    }
}

#[derive(Debug)]
struct QueueWriter {
    tx: Sender<Entity>,
    capacity: usize,
    peak_occupancy: Arc<AtomicUsize>,
}

impl QueueWriter {
    /// Write an entity, waiting for room if the queue is full.
    ///
    /// Gives up and discards the entity if the batch is cancelled while
    /// waiting.
    async fn write(&self, entity: Entity, signal: &CancellationSignal) {
        let permit = tokio::select! {
            biased;
            _ = signal.cancelled() => {
                tracing::trace!(
                    key = %entity.key,
                    "cancelled while waiting for queue space, discarding entity"
                );
                return;
            }
            permit = self.tx.reserve() => permit,
        };

        match permit {
            Ok(permit) => {
                permit.send(entity);
                let occupancy = self.capacity - self.tx.capacity();
                self.peak_occupancy.fetch_max(occupancy, Ordering::SeqCst);
            }
            Err(_) => {
                tracing::warn!(
                    key = %entity.key,
                    "entity queue consumer is gone, discarding entity"
                );
            }
        }
    }
}

#[derive(Debug)]
pub(crate) struct CoreBoundedQueue {
    config: BatchConfig,
    fetcher: DynFetcher,
    progress: Option<DynProgressReporter>,
    peak_occupancy: Arc<AtomicUsize>,
}

impl CoreBoundedQueue {
    pub(crate) fn new(
        config: BatchConfig,
        fetcher: DynFetcher,
        progress: Option<DynProgressReporter>,
    ) -> Self {
        Self {
            config,
            fetcher,
            progress,
            peak_occupancy: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// The highest number of entities that sat in the queue at once,
    /// over every batch run by this orchestrator.
    pub(crate) fn peak_queue_occupancy(&self) -> usize {
        self.peak_occupancy.load(Ordering::SeqCst)
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

        tracing::debug!(
            keys = keys.len(),
            capacity = self.config.queue_capacity,
            "bounded queue batch start"
        );

        let state = BatchState::new(
            sink,
            signal.clone(),
            self.config.drop_failures,
            self.progress.clone(),
            keys.len(),
        );

        let (mut queue, queue_rx) = EntityQueue::new(
            self.config.queue_capacity,
            self.peak_occupancy.clone(),
        );

        let consumer = tokio::task::spawn(Self::consume(queue_rx, state.clone()));

        let mut producers = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(writer) = queue.writer() {
                producers.push(tokio::task::spawn(Self::produce(
                    self.fetcher.clone(),
                    key,
                    writer,
                    state.clone(),
                )));
            }
        }

        if join_or_cancel(producers, &state).await {
            return state.finish(true).await;
        }

        queue.mark_complete();

        tokio::select! {
            biased;
            _ = signal.cancelled() => return state.finish(true).await,
            res = consumer => {
                if let Err(err) = res {
                    tracing::warn!("entity queue consumer failed: {err}");
                }
            }
        }

        tracing::debug!(
            peak_occupancy = self.peak_queue_occupancy(),
            "entity queue drained"
        );
        state.finish(signal.is_cancelled()).await
    }

    async fn produce(
        fetcher: DynFetcher,
        key: Key,
        writer: QueueWriter,
        state: Arc<BatchState>,
    ) {
        if state.signal.is_cancelled() {
            return;
        }

        let outcome = fetch_outcome(&fetcher, key, &state.signal).await;
        state.complete_attempt();

        match outcome {
            FetchOutcome::Success(entity) => {
                if state.signal.is_cancelled() {
                    return;
                }
                writer.write(entity, &state.signal).await;
            }
            FetchOutcome::Failure(err) => state.record_failure(key, err),
            FetchOutcome::Cancelled => (),
        }
    }

    async fn consume(mut queue_rx: Receiver<Entity>, state: Arc<BatchState>) {
        loop {
            let entity = tokio::select! {
                biased;
                _ = state.signal.cancelled() => break,
                entity = queue_rx.recv() => entity,
            };
            match entity {
                Some(entity) => {
                    state.deliver(entity).await;
                }
                None => break,
            }
        }
    }
}

impl Orchestrator for CoreBoundedQueue {
    fn strategy(&self) -> Strategy {
        Strategy::BoundedQueue
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
