//! Plumbing shared by every orchestrator: per-batch bookkeeping, sink
//! access and the fetch attempt itself.

use batchfetch_api::{
    fetch::DynFetcher, progress::percent_complete,
    progress::DynProgressReporter, sink::DynSink, BatchResult, BfError,
    CancellationSignal, Entity, FetchOutcome, Key,
};
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};
use tokio::{
    sync::{OwnedSemaphorePermit, RwLock},
    task::JoinHandle,
};

/// Bookkeeping for one batch, shared by all tasks of that batch.
///
/// Every delivery holds a read guard on `open` from its final
/// cancellation check until the sink has accepted the entity. Taking the
/// result takes the write guard and closes the batch, so an entity is in
/// the [BatchResult] exactly when the sink received it.
#[derive(Debug)]
pub(crate) struct BatchState {
    pub(crate) signal: CancellationSignal,
    sink: DynSink,
    // Held around every delivery if the sink is not safe for concurrent
    // writers.
    sink_gate: Option<tokio::sync::Mutex<()>>,
    open: Arc<RwLock<bool>>,
    drop_failures: bool,
    delivered: Arc<Mutex<Vec<Entity>>>,
    errors: Mutex<Vec<BfError>>,
    progress: Option<DynProgressReporter>,
    total: usize,
    done: AtomicUsize,
}

impl BatchState {
    pub(crate) fn new(
        sink: DynSink,
        signal: CancellationSignal,
        drop_failures: bool,
        progress: Option<DynProgressReporter>,
        total: usize,
    ) -> Arc<Self> {
        let sink_gate = if sink.is_concurrent_safe() {
            None
        } else {
            Some(tokio::sync::Mutex::new(()))
        };
        Arc::new(Self {
            signal,
            sink,
            sink_gate,
            open: Arc::new(RwLock::new(true)),
            drop_failures,
            delivered: Arc::new(Mutex::new(Vec::with_capacity(total))),
            errors: Mutex::new(Vec::new()),
            progress,
            total,
            done: AtomicUsize::new(0),
        })
    }

    /// Deliver an entity to the sink, unless the batch has been cancelled
    /// or already finished.
    ///
    /// Returns false if the entity was discarded. For sinks with thread
    /// affinity, true means the delivery was dispatched. The dispatched
    /// callback checks the signal again before touching the sink.
    pub(crate) async fn deliver(&self, entity: Entity) -> bool {
        if self.signal.is_cancelled() {
            tracing::trace!(key = %entity.key, "discarding entity, batch cancelled");
            return false;
        }

        let _gate = match &self.sink_gate {
            Some(gate) => Some(gate.lock().await),
            None => None,
        };
        let open = self.open.clone().read_owned().await;
        if !*open || self.signal.is_cancelled() {
            tracing::trace!(key = %entity.key, "discarding entity, batch closed");
            return false;
        }

        tracing::trace!(key = %entity.key, "delivering entity");

        if self.sink.requires_affinity() {
            let sink = self.sink.clone();
            let signal = self.signal.clone();
            let delivered = self.delivered.clone();
            self.sink.run_on_affinity_thread(Box::new(move || {
                if signal.is_cancelled() {
                    tracing::trace!(
                        key = %entity.key,
                        "discarding queued delivery, batch cancelled"
                    );
                    return;
                }
                delivered.lock().unwrap().push(entity.clone());
                sink.deliver(entity);
                // The batch stays open until the callback has run.
                drop(open);
            }));
            return true;
        }

        self.delivered.lock().unwrap().push(entity.clone());
        self.sink.deliver(entity);
        true
    }

    /// Record a failed attempt, unless failures are being dropped or the
    /// batch has been cancelled.
    pub(crate) fn record_failure(&self, key: Key, err: BfError) {
        if self.drop_failures {
            tracing::debug!(%key, ?err, "dropping failed fetch");
            return;
        }
        if self.signal.is_cancelled() {
            return;
        }
        tracing::warn!("fetch for key {key} failed: {err}");
        self.errors.lock().unwrap().push(err);
    }

    /// Apply the outcome of one attempt.
    pub(crate) async fn handle_outcome(&self, key: Key, outcome: FetchOutcome) {
        match outcome {
            FetchOutcome::Success(entity) => {
                self.deliver(entity).await;
            }
            FetchOutcome::Failure(err) => self.record_failure(key, err),
            FetchOutcome::Cancelled => {
                tracing::trace!(%key, "fetch cancelled");
            }
        }
    }

    /// Mark one attempt as having reached a terminal state.
    pub(crate) fn complete_attempt(&self) {
        let done = self.done.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(progress) = &self.progress {
            progress.report(percent_complete(done, self.total));
        }
    }

    /// Close the batch and take everything recorded into a [BatchResult].
    ///
    /// Waits for deliveries already handed to the sink. Stragglers of a
    /// cancelled batch may still be running, nothing they produce after
    /// this point reaches the sink.
    pub(crate) async fn finish(&self, cancelled: bool) -> BatchResult {
        let out = self.close(cancelled).await;
        tracing::debug!(
            entities = out.entities.len(),
            errors = out.errors.len(),
            cancelled = out.cancelled,
            "batch finished"
        );
        out
    }

    /// Close the batch because of `err`.
    ///
    /// Entities delivered so far stay delivered but are not part of the
    /// result, which holds `err` alone.
    pub(crate) async fn abort(&self, err: BfError) -> BatchResult {
        let closed = self.close(false).await;
        tracing::debug!(
            delivered = closed.entities.len(),
            errors = 1,
            "batch aborted"
        );
        BatchResult {
            entities: Vec::new(),
            errors: vec![err],
            cancelled: false,
        }
    }

    async fn close(&self, cancelled: bool) -> BatchResult {
        let mut open = self.open.write().await;
        *open = false;
        BatchResult {
            entities: std::mem::take(&mut *self.delivered.lock().unwrap()),
            errors: std::mem::take(&mut *self.errors.lock().unwrap()),
            cancelled,
        }
    }
}

/// Run one fetch attempt and hand its outcome to the batch.
///
/// The fetch itself is never raced against the signal. Once started it
/// runs to completion, or until the fetcher honours the signal. The
/// signal is checked before starting, and again by the delivery after the
/// fetch returns. The admission permit, if any, is released as soon as
/// the fetch is terminal.
pub(crate) async fn run_attempt(
    fetcher: DynFetcher,
    key: Key,
    state: Arc<BatchState>,
    permit: Option<OwnedSemaphorePermit>,
) {
    if state.signal.is_cancelled() {
        return;
    }
    let outcome = fetch_outcome(&fetcher, key, &state.signal).await;
    drop(permit);
    state.complete_attempt();
    state.handle_outcome(key, outcome).await;
}

/// Fetch one key, converting the result into a [FetchOutcome].
pub(crate) async fn fetch_outcome(
    fetcher: &DynFetcher,
    key: Key,
    signal: &CancellationSignal,
) -> FetchOutcome {
    fetcher.fetch_one(key, signal.clone()).await.into()
}

/// Wait for every task, or until the batch is cancelled.
///
/// Returns true if the wait was abandoned because of cancellation. The
/// abandoned tasks are detached, not aborted.
pub(crate) async fn join_or_cancel(
    tasks: Vec<JoinHandle<()>>,
    state: &BatchState,
) -> bool {
    let mut pending = tasks.into_iter().collect::<FuturesUnordered<_>>();
    loop {
        let next = tokio::select! {
            biased;
            _ = state.signal.cancelled() => return true,
            next = pending.next() => next,
        };
        match next {
            None => return state.signal.is_cancelled(),
            Some(Ok(())) => (),
            Some(Err(err)) => {
                tracing::warn!("fetch task failed: {err}");
                state
                    .errors
                    .lock()
                    .unwrap()
                    .push(BfError::other_src("fetch task failed", err));
            }
        }
    }
}

#[cfg(test)]
mod test;
