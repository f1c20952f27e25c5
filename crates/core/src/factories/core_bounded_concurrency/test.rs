use super::*;
use batchfetch_api::BfError;
use batchfetch_test_utils::{
    fetcher::TestFetcher,
    id::{key_list, sorted_keys},
    sink::RecordingSink,
};
use std::time::Duration;

fn setup(
    fetcher: TestFetcher,
    max_concurrency: Option<usize>,
) -> (Arc<TestFetcher>, CoreBoundedConcurrency) {
    let fetcher = Arc::new(fetcher);
    let orchestrator = CoreBoundedConcurrency::new(
        BatchConfig {
            max_concurrency,
            ..Default::default()
        },
        fetcher.clone(),
        None,
    );
    (fetcher, orchestrator)
}

#[tokio::test(flavor = "multi_thread")]
async fn in_flight_never_exceeds_limit() {
    for (limit, count) in [(1, 5), (3, 12), (10, 40), (16, 8)] {
        let (fetcher, orchestrator) = setup(
            TestFetcher::new().with_delay(Duration::from_millis(5)),
            Some(limit),
        );

        let result = orchestrator
            .run(
                key_list(count),
                Arc::new(RecordingSink::new()),
                CancellationSignal::new(),
            )
            .await;

        assert!(result.is_complete());
        assert_eq!(key_list(count), sorted_keys(&result.entities));
        assert!(
            fetcher.max_in_flight() <= limit,
            "limit {limit}, saw {}",
            fetcher.max_in_flight()
        );
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn limit_is_reached() {
    let (fetcher, orchestrator) = setup(
        TestFetcher::new().with_delay(Duration::from_millis(50)),
        Some(4),
    );

    orchestrator
        .run(
            key_list(12),
            Arc::new(RecordingSink::new()),
            CancellationSignal::new(),
        )
        .await;

    assert_eq!(4, fetcher.max_in_flight());
}

#[tokio::test(flavor = "multi_thread")]
async fn issues_in_key_order() {
    let (fetcher, orchestrator) = setup(TestFetcher::new(), Some(1));

    orchestrator
        .run(
            key_list(8),
            Arc::new(RecordingSink::new()),
            CancellationSignal::new(),
        )
        .await;

    assert_eq!(key_list(8), fetcher.started());
}

#[tokio::test(flavor = "multi_thread")]
async fn unbounded_issues_everything() {
    let (fetcher, orchestrator) = setup(
        TestFetcher::new().with_delay(Duration::from_millis(50)),
        None,
    );

    let result = orchestrator
        .run(
            key_list(30),
            Arc::new(RecordingSink::new()),
            CancellationSignal::new(),
        )
        .await;

    assert!(result.is_complete());
    assert_eq!(30, fetcher.max_in_flight());
}

#[tokio::test(flavor = "multi_thread")]
async fn failure_is_recorded() {
    let (_, orchestrator) = setup(
        TestFetcher::new()
            .with_failure(Key(2), BfError::transport("status 500")),
        Some(2),
    );
    let sink = Arc::new(RecordingSink::new());

    let result = orchestrator
        .run(key_list(3), sink.clone(), CancellationSignal::new())
        .await;

    assert!(!result.cancelled);
    assert_eq!(1, result.errors.len());
    assert!(matches!(result.errors[0], BfError::Transport { .. }));
    assert_eq!(vec![Key(1), Key(3)], sorted_keys(&result.entities));
    assert_eq!(vec![Key(1), Key(3)], sorted_keys(&sink.entities()));
}

#[tokio::test(flavor = "multi_thread")]
async fn pre_cancelled_batch_does_nothing() {
    let (fetcher, orchestrator) = setup(TestFetcher::new(), Some(2));
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

#[tokio::test(start_paused = true)]
async fn cancel_while_waiting_for_slot_stops_issuing() {
    let (fetcher, orchestrator) = setup(
        TestFetcher::new().with_delay(Duration::from_secs(3600)),
        Some(2),
    );
    let sink = Arc::new(RecordingSink::new());
    let signal = CancellationSignal::new();
    signal.cancel_after(Duration::from_millis(10));

    let start = tokio::time::Instant::now();
    let result = orchestrator.run(key_list(10), sink.clone(), signal).await;

    assert!(result.cancelled);
    assert!(start.elapsed() < Duration::from_secs(1));
    assert!(result.entities.is_empty());

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(vec![Key(1), Key(2)], fetcher.started());
}

#[tokio::test(flavor = "multi_thread")]
async fn cancel_mid_batch_stops_issuing() {
    let signal = CancellationSignal::new();
    let (fetcher, orchestrator) = setup(
        TestFetcher::new()
            .with_delay(Duration::from_millis(5))
            .cancel_after_completed(3, signal.clone()),
        Some(1),
    );
    let sink = Arc::new(RecordingSink::new());

    let result = orchestrator.run(key_list(10), sink.clone(), signal).await;

    assert!(result.cancelled);
    assert!(result.errors.is_empty());
    assert_eq!(vec![Key(1), Key(2), Key(3)], fetcher.started());
    assert_eq!(vec![Key(1), Key(2)], sorted_keys(&result.entities));
}

#[tokio::test(flavor = "multi_thread")]
async fn factory_reads_max_concurrency() {
    let mut config = Config::default();
    config
        .set_module_config(&BatchModConfig {
            batch: BatchConfig {
                max_concurrency: Some(2),
                ..Default::default()
            },
        })
        .unwrap();
    let fetcher =
        Arc::new(TestFetcher::new().with_delay(Duration::from_millis(20)));
    let builder = Builder {
        config,
        fetcher: fetcher.clone(),
        orchestrator: CoreBoundedConcurrencyFactory::create(),
        progress: None,
    };

    let orchestrator = builder.build().await.unwrap();
    assert_eq!(Strategy::BoundedConcurrency, orchestrator.strategy());

    let result = orchestrator
        .run(
            key_list(6),
            Arc::new(RecordingSink::new()),
            CancellationSignal::new(),
        )
        .await;
    assert!(result.is_complete());
    assert_eq!(2, fetcher.max_in_flight());
}
