use super::*;
use batchfetch_api::Key;

#[derive(Debug, Default)]
pub(crate) struct ThreadRecordingSink(pub Mutex<Vec<(Key, ThreadId)>>);

impl Sink for ThreadRecordingSink {
    fn deliver(&self, entity: Entity) {
        self.0
            .lock()
            .unwrap()
            .push((entity.key, std::thread::current().id()));
    }

    fn is_concurrent_safe(&self) -> bool {
        false
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn callbacks_run_on_affinity_thread() {
    let inner = Arc::new(ThreadRecordingSink::default());
    let sink = AffinitySink::create(inner.clone()).unwrap();

    let tasks = (0..8)
        .map(|i| {
            let sink = sink.clone();
            tokio::task::spawn(async move {
                let deliver_to = sink.clone();
                sink.run_on_affinity_thread(Box::new(move || {
                    deliver_to.deliver(Entity::new(Key(i), "x"))
                }));
            })
        })
        .collect::<Vec<_>>();
    for task in tasks {
        task.await.unwrap();
    }
    sink.flush().await;

    let delivered = inner.0.lock().unwrap().clone();
    assert_eq!(8, delivered.len());
    assert!(delivered.iter().all(|(_, id)| *id == sink.thread_id()));
    assert_ne!(std::thread::current().id(), sink.thread_id());
}

#[test]
fn mem_sink_collects_in_order() {
    let sink = MemSink::create();
    assert!(sink.is_empty());
    sink.deliver(Entity::new(Key(2), "b"));
    sink.deliver(Entity::new(Key(1), "a"));
    assert_eq!(
        vec![Key(2), Key(1)],
        sink.entities().iter().map(|e| e.key).collect::<Vec<_>>()
    );
}
