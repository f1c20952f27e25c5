use super::*;
use batchfetch_api::progress::ProgressReporter;
use batchfetch_test_utils::{
    fetcher::TestFetcher,
    id::{key_list, random_key_list, test_entity},
    sink::RecordingSink,
};
use std::sync::Mutex;
use std::time::Duration;

fn setup(fetcher: TestFetcher) -> (Arc<TestFetcher>, CoreSequential) {
    let fetcher = Arc::new(fetcher);
    let orchestrator = CoreSequential::new(fetcher.clone(), None);
    (fetcher, orchestrator)
}

#[tokio::test(flavor = "multi_thread")]
async fn delivers_in_key_order() {
    let keys = random_key_list(20);
    let (_, orchestrator) = setup(
        TestFetcher::new()
            .with_delay(Duration::from_millis(1))
            .with_key_delay(keys[0], Duration::from_millis(20)),
    );
    let sink = Arc::new(RecordingSink::new());

    let result = orchestrator
        .run(keys.clone(), sink.clone(), CancellationSignal::new())
        .await;

    assert!(result.is_complete());
    assert_eq!(keys, sink.keys());
    assert_eq!(
        keys,
        result.entities.iter().map(|e| e.key).collect::<Vec<_>>()
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn fetches_never_overlap() {
    let (fetcher, orchestrator) =
        setup(TestFetcher::new().with_delay(Duration::from_millis(2)));

    let result = orchestrator
        .run(
            key_list(10),
            Arc::new(RecordingSink::new()),
            CancellationSignal::new(),
        )
        .await;

    assert!(result.is_complete());
    assert_eq!(1, fetcher.max_in_flight());
}

#[tokio::test(flavor = "multi_thread")]
async fn first_failure_aborts_batch() {
    let (fetcher, orchestrator) = setup(
        TestFetcher::new()
            .with_failure(Key(3), BfError::transport("status 500"))
            .with_failure(Key(4), BfError::not_found(Key(4))),
    );
    let sink = Arc::new(RecordingSink::new());

    let result = orchestrator
        .run(key_list(5), sink.clone(), CancellationSignal::new())
        .await;

    // The already delivered entities are not part of the result ...
    assert!(result.entities.is_empty());
    assert!(!result.cancelled);
    assert_eq!(1, result.errors.len());
    assert!(matches!(result.errors[0], BfError::Transport { .. }));

    // ... but they did reach the sink.
    assert_eq!(vec![Key(1), Key(2)], sink.keys());
    assert_eq!(vec![Key(1), Key(2), Key(3)], fetcher.started());
}

#[tokio::test(flavor = "multi_thread")]
async fn pre_cancelled_batch_does_nothing() {
    let (fetcher, orchestrator) = setup(TestFetcher::new());
    let sink = Arc::new(RecordingSink::new());
    let signal = CancellationSignal::new();
    signal.signal();

    let result = orchestrator.run(key_list(3), sink.clone(), signal).await;

    assert!(result.cancelled);
    assert!(result.entities.is_empty());
    assert!(result.errors.is_empty());
    assert!(sink.is_empty());
    assert_eq!(0, fetcher.started_count());
}

#[tokio::test(flavor = "multi_thread")]
async fn cancel_mid_batch_stops_issuing() {
    let signal = CancellationSignal::new();
    let (fetcher, orchestrator) =
        setup(TestFetcher::new().cancel_after_completed(2, signal.clone()));
    let sink = Arc::new(RecordingSink::new());

    let result = orchestrator.run(key_list(5), sink.clone(), signal).await;

    assert!(result.cancelled);
    assert!(result.errors.is_empty());
    // The second fetch completed after the signal was flipped, so its
    // entity is discarded.
    assert_eq!(vec![Key(1), Key(2)], fetcher.started());
    assert_eq!(vec![Key(1)], sink.keys());
    assert_eq!(vec![test_entity(Key(1))], result.entities);
}

#[tokio::test(start_paused = true)]
async fn cancel_does_not_wait_for_slow_fetch() {
    let (fetcher, orchestrator) =
        setup(TestFetcher::new().with_delay(Duration::from_secs(3600)));
    let signal = CancellationSignal::new();
    signal.cancel_after(Duration::from_millis(10));

    let start = tokio::time::Instant::now();
    let result = orchestrator
        .run(key_list(3), Arc::new(RecordingSink::new()), signal)
        .await;

    assert!(result.cancelled);
    assert!(start.elapsed() < Duration::from_secs(1));
    assert_eq!(vec![Key(1)], fetcher.started());
}

#[derive(Debug, Default)]
struct RecordingProgress(Mutex<Vec<u8>>);

impl ProgressReporter for RecordingProgress {
    fn report(&self, percent_complete: u8) {
        self.0.lock().unwrap().push(percent_complete);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn reports_progress() {
    let progress = Arc::new(RecordingProgress::default());
    let orchestrator =
        CoreSequential::new(Arc::new(TestFetcher::new()), Some(progress.clone()));

    let result = orchestrator
        .run(
            key_list(4),
            Arc::new(RecordingSink::new()),
            CancellationSignal::new(),
        )
        .await;

    assert!(result.is_complete());
    assert_eq!(vec![25, 50, 75, 100], *progress.0.lock().unwrap());
}

#[tokio::test(flavor = "multi_thread")]
async fn factory_builds_sequential_orchestrator() {
    let builder = Builder {
        config: Config::default(),
        fetcher: Arc::new(TestFetcher::new()),
        orchestrator: CoreSequentialFactory::create(),
        progress: None,
    }
    .with_default_config()
    .unwrap();

    let orchestrator = builder.build().await.unwrap();
    assert_eq!(Strategy::Sequential, orchestrator.strategy());
}
