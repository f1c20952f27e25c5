use super::*;
use batchfetch_api::sink::{AffinityCallback, Sink};

#[derive(Debug, Default)]
struct UnsafeSink {
    writers: AtomicUsize,
    max_writers: AtomicUsize,
    count: AtomicUsize,
}

impl Sink for UnsafeSink {
    fn deliver(&self, _entity: Entity) {
        let now = self.writers.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_writers.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(std::time::Duration::from_millis(2));
        self.count.fetch_add(1, Ordering::SeqCst);
        self.writers.fetch_sub(1, Ordering::SeqCst);
    }

    fn is_concurrent_safe(&self) -> bool {
        false
    }
}

/// An affinity sink whose "thread" is a list the test drains by hand.
#[derive(Default)]
struct ManualAffinitySink {
    queued: Mutex<Vec<AffinityCallback>>,
    received: Mutex<Vec<Key>>,
}

impl std::fmt::Debug for ManualAffinitySink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualAffinitySink")
            .field("queued", &self.queued.lock().unwrap().len())
            .field("received", &self.received)
            .finish()
    }
}

impl ManualAffinitySink {
    fn run_queued(&self) {
        let queued = std::mem::take(&mut *self.queued.lock().unwrap());
        for callback in queued {
            callback();
        }
    }
}

impl Sink for ManualAffinitySink {
    fn deliver(&self, entity: Entity) {
        self.received.lock().unwrap().push(entity.key);
    }

    fn requires_affinity(&self) -> bool {
        true
    }

    fn run_on_affinity_thread(&self, callback: AffinityCallback) {
        self.queued.lock().unwrap().push(callback);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn unsafe_sink_is_serialized() {
    let sink = Arc::new(UnsafeSink::default());
    let state =
        BatchState::new(sink.clone(), CancellationSignal::new(), false, None, 16);

    let tasks = (0..16)
        .map(|i| {
            let state = state.clone();
            tokio::task::spawn(async move {
                state.deliver(Entity::new(Key(i), "x")).await;
            })
        })
        .collect::<Vec<_>>();
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(16, sink.count.load(Ordering::SeqCst));
    assert_eq!(1, sink.max_writers.load(Ordering::SeqCst));
    assert_eq!(16, state.finish(false).await.entities.len());
}

#[tokio::test]
async fn nothing_recorded_after_cancel() {
    let sink = Arc::new(UnsafeSink::default());
    let signal = CancellationSignal::new();
    let state = BatchState::new(sink.clone(), signal.clone(), false, None, 2);

    signal.signal();
    assert!(!state.deliver(Entity::new(Key(1), "x")).await);
    state.record_failure(Key(2), BfError::transport("boom"));

    let result = state.finish(true).await;
    assert!(result.entities.is_empty());
    assert!(result.errors.is_empty());
    assert_eq!(0, sink.count.load(Ordering::SeqCst));
}

#[tokio::test]
async fn nothing_delivered_after_finish() {
    let sink = Arc::new(UnsafeSink::default());
    let state =
        BatchState::new(sink.clone(), CancellationSignal::new(), false, None, 2);

    assert!(state.deliver(Entity::new(Key(1), "x")).await);
    assert_eq!(1, state.finish(false).await.entities.len());

    assert!(!state.deliver(Entity::new(Key(2), "x")).await);
    assert_eq!(1, sink.count.load(Ordering::SeqCst));
}

#[tokio::test]
async fn dropped_failures_are_not_recorded() {
    let sink = Arc::new(UnsafeSink::default());
    let state = BatchState::new(sink, CancellationSignal::new(), true, None, 1);
    state
        .handle_outcome(Key(1), FetchOutcome::Failure(BfError::transport("boom")))
        .await;
    assert!(state.finish(false).await.errors.is_empty());
}

#[tokio::test]
async fn abort_reports_only_the_error_and_closes_batch() {
    let sink = Arc::new(UnsafeSink::default());
    let state =
        BatchState::new(sink.clone(), CancellationSignal::new(), false, None, 3);

    assert!(state.deliver(Entity::new(Key(1), "x")).await);
    let result = state.abort(BfError::not_found(Key(2))).await;

    assert!(result.entities.is_empty());
    assert!(!result.cancelled);
    assert_eq!(1, result.errors.len());
    assert!(matches!(result.errors[0], BfError::NotFound { key: Key(2) }));

    assert!(!state.deliver(Entity::new(Key(3), "x")).await);
    assert_eq!(1, sink.count.load(Ordering::SeqCst));
}

#[tokio::test]
async fn queued_affinity_callbacks_skip_after_cancel() {
    let sink = Arc::new(ManualAffinitySink::default());
    let signal = CancellationSignal::new();
    let state = BatchState::new(sink.clone(), signal.clone(), false, None, 3);

    assert!(state.deliver(Entity::new(Key(1), "x")).await);
    sink.run_queued();
    assert!(state.deliver(Entity::new(Key(2), "x")).await);
    assert!(state.deliver(Entity::new(Key(3), "x")).await);

    signal.signal();
    sink.run_queued();

    let result = state.finish(true).await;
    assert_eq!(vec![Key(1)], *sink.received.lock().unwrap());
    assert_eq!(
        vec![Key(1)],
        result.entities.iter().map(|e| e.key).collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn finish_waits_for_queued_affinity_callbacks() {
    let sink = Arc::new(ManualAffinitySink::default());
    let state =
        BatchState::new(sink.clone(), CancellationSignal::new(), false, None, 1);

    assert!(state.deliver(Entity::new(Key(1), "x")).await);

    let finish = tokio::task::spawn({
        let state = state.clone();
        async move { state.finish(false).await }
    });
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    assert!(!finish.is_finished());

    sink.run_queued();
    let result = finish.await.unwrap();
    assert_eq!(vec![Key(1)], *sink.received.lock().unwrap());
    assert_eq!(1, result.entities.len());
}
