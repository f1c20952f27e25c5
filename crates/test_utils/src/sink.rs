//! A sink that records everything delivered to it.

use batchfetch_api::{sink::Sink, Entity, Key};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex,
};
use std::time::Duration;

/// Records deliveries, and how many deliveries overlapped.
#[derive(Debug, Default)]
pub struct RecordingSink {
    entities: Mutex<Vec<Entity>>,
    concurrent_safe: bool,
    write_delay: Option<Duration>,
    writers: AtomicUsize,
    max_writers: AtomicUsize,
}

impl RecordingSink {
    /// A sink that declares itself safe for concurrent writers.
    pub fn new() -> Self {
        Self {
            concurrent_safe: true,
            ..Default::default()
        }
    }

    /// A sink that asks orchestrators to serialize deliveries. Each
    /// delivery takes `write_delay`, to widen any overlap.
    pub fn not_concurrent_safe(write_delay: Duration) -> Self {
        Self {
            concurrent_safe: false,
            write_delay: Some(write_delay),
            ..Default::default()
        }
    }

    /// Everything delivered so far, in delivery order.
    pub fn entities(&self) -> Vec<Entity> {
        self.entities.lock().unwrap().clone()
    }

    /// The keys delivered so far, in delivery order.
    pub fn keys(&self) -> Vec<Key> {
        self.entities.lock().unwrap().iter().map(|e| e.key).collect()
    }

    /// The number of deliveries so far.
    pub fn len(&self) -> usize {
        self.entities.lock().unwrap().len()
    }

    /// True if nothing has been delivered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The highest number of deliveries that were running at once.
    pub fn max_concurrent_writers(&self) -> usize {
        self.max_writers.load(Ordering::SeqCst)
    }
}

impl Sink for RecordingSink {
    fn deliver(&self, entity: Entity) {
        let writers = self.writers.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_writers.fetch_max(writers, Ordering::SeqCst);
        if let Some(delay) = self.write_delay {
            std::thread::sleep(delay);
        }
        self.entities.lock().unwrap().push(entity);
        self.writers.fetch_sub(1, Ordering::SeqCst);
    }

    fn is_concurrent_safe(&self) -> bool {
        self.concurrent_safe
    }
}
