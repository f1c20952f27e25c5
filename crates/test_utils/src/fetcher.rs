//! A programmable fetcher for exercising orchestrators.

use crate::id::test_entity;
use batchfetch_api::{
    fetch::Fetcher, BfError, BfResult, BoxFut, CancellationSignal, Entity,
    Key,
};
use std::collections::HashMap;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex,
};
use std::time::Duration;

/// A fetcher whose latency and failures are set up per key.
///
/// Every successful fetch produces [test_entity]. The fetcher counts
/// started and completed fetches and tracks how many were in flight at
/// once.
#[derive(Debug, Default)]
pub struct TestFetcher {
    keys: Vec<Key>,
    keys_failure: Option<BfError>,
    delay: Duration,
    key_delays: HashMap<Key, Duration>,
    failures: HashMap<Key, BfError>,
    honour_signal: bool,
    cancel_after_completed: Option<(usize, CancellationSignal)>,
    started: Mutex<Vec<Key>>,
    completed: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl TestFetcher {
    /// A fetcher that answers every key immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// The keys returned by [Fetcher::fetch_keys].
    pub fn with_keys(mut self, keys: Vec<Key>) -> Self {
        self.keys = keys;
        self
    }

    /// Make [Fetcher::fetch_keys] fail.
    pub fn with_keys_failure(mut self, err: BfError) -> Self {
        self.keys_failure = Some(err);
        self
    }

    /// Latency of every fetch without a specific delay.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Latency of fetching `key`.
    pub fn with_key_delay(mut self, key: Key, delay: Duration) -> Self {
        self.key_delays.insert(key, delay);
        self
    }

    /// Make fetching `key` fail with `err`.
    pub fn with_failure(mut self, key: Key, err: BfError) -> Self {
        self.failures.insert(key, err);
        self
    }

    /// Stop sleeping and return [BfError::Cancelled] when the signal
    /// passed to the fetch is flipped. Without this, fetches ignore the
    /// signal and run to completion.
    pub fn honouring_signal(mut self) -> Self {
        self.honour_signal = true;
        self
    }

    /// Flip `signal` as soon as `count` fetches have completed.
    pub fn cancel_after_completed(
        mut self,
        count: usize,
        signal: CancellationSignal,
    ) -> Self {
        self.cancel_after_completed = Some((count, signal));
        self
    }

    /// The keys fetches were started for, in start order.
    pub fn started(&self) -> Vec<Key> {
        self.started.lock().unwrap().clone()
    }

    /// The number of fetches started.
    pub fn started_count(&self) -> usize {
        self.started.lock().unwrap().len()
    }

    /// The number of fetches that returned, whatever the outcome.
    pub fn completed_count(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// The number of fetches in flight right now.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// The highest number of fetches that were in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn fetch_inner(
        &self,
        key: Key,
        signal: CancellationSignal,
    ) -> BfResult<Entity> {
        self.started.lock().unwrap().push(key);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = self.key_delays.get(&key).copied().unwrap_or(self.delay);
        let cancelled = if self.honour_signal {
            tokio::select! {
                _ = signal.cancelled() => true,
                _ = tokio::time::sleep(delay) => false,
            }
        } else {
            tokio::time::sleep(delay).await;
            false
        };

        let out = if cancelled {
            Err(BfError::Cancelled)
        } else if let Some(err) = self.failures.get(&key) {
            Err(err.clone())
        } else {
            Ok(test_entity(key))
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        let completed = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((count, signal)) = &self.cancel_after_completed {
            if completed >= *count {
                signal.signal();
            }
        }

        out
    }
}

impl Fetcher for TestFetcher {
    fn fetch_keys(
        &self,
        signal: CancellationSignal,
    ) -> BoxFut<'_, BfResult<Vec<Key>>> {
        Box::pin(async move {
            if signal.is_cancelled() {
                return Err(BfError::Cancelled);
            }
            match &self.keys_failure {
                Some(err) => Err(err.clone()),
                None => Ok(self.keys.clone()),
            }
        })
    }

    fn fetch_one(
        &self,
        key: Key,
        signal: CancellationSignal,
    ) -> BoxFut<'_, BfResult<Entity>> {
        Box::pin(self.fetch_inner(key, signal))
    }
}
