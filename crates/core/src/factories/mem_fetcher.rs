//! The in-memory fetcher implementation provided by batchfetch.

use batchfetch_api::{
    fetch::{DynFetcher, Fetcher},
    BfError, BfResult, BoxFut, CancellationSignal, Entity, Key,
};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;


/// Serves records held in memory as if they came from a remote service.
///
/// Each record is a JSON document stored under its key. A fetch waits
/// out the configured latency, then:
///
/// - fails with [BfError::Transport] if a failure status was injected for
///   the key,
/// - fails with [BfError::NotFound] if no record is stored for the key,
/// - fails with [BfError::Deserialization] if the record is not valid
///   JSON or is the JSON `null` document,
/// - otherwise returns the record as the entity payload.
///
/// The latency wait honours the cancellation signal.
#[derive(Debug, Default)]
pub struct MemFetcher {
    records: RwLock<HashMap<Key, bytes::Bytes>>,
    failures: RwLock<HashMap<Key, u16>>,
    latency: Duration,
}

impl MemFetcher {
    /// Construct an empty fetcher answering after `latency`.
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            ..Default::default()
        }
    }

    /// Construct a fetcher serving `records`, erased to a [DynFetcher].
    pub fn create(
        latency: Duration,
        records: impl IntoIterator<Item = (Key, bytes::Bytes)>,
    ) -> DynFetcher {
        let out = Self::new(latency);
        for (key, data) in records {
            out.insert(key, data);
        }
        Arc::new(out)
    }

    /// Store (or replace) the record for `key`.
    pub fn insert(&self, key: Key, data: impl Into<bytes::Bytes>) {
        self.records.write().unwrap().insert(key, data.into());
    }

    /// Remove the record for `key`. Subsequent fetches report not found.
    pub fn remove(&self, key: Key) {
        self.records.write().unwrap().remove(&key);
    }

    /// Make every fetch of `key` fail with the given transport status.
    pub fn fail_with_status(&self, key: Key, status: u16) {
        self.failures.write().unwrap().insert(key, status);
    }

    async fn wait_latency(&self, signal: &CancellationSignal) -> BfResult<()> {
        tokio::select! {
            biased;
            _ = signal.cancelled() => Err(BfError::Cancelled),
            _ = tokio::time::sleep(self.latency) => Ok(()),
        }
    }

    async fn fetch_inner(
        &self,
        key: Key,
        signal: CancellationSignal,
    ) -> BfResult<Entity> {
        self.wait_latency(&signal).await?;

        if let Some(status) = self.failures.read().unwrap().get(&key) {
            return Err(BfError::transport(format!(
                "Unable to retrieve record (key={key}). Status code {status}"
            )));
        }

        let data = self
            .records
            .read()
            .unwrap()
            .get(&key)
            .cloned()
            .ok_or_else(|| BfError::not_found(key))?;

        match serde_json::from_slice::<serde_json::Value>(&data) {
            Ok(serde_json::Value::Null) => Err(BfError::deserialization(
                format!("record for key {key} is null"),
            )),
            Ok(_) => Ok(Entity { key, data }),
            Err(err) => Err(BfError::deserialization_src(
                format!("record for key {key} is not valid json"),
                err,
            )),
        }
    }
}

impl Fetcher for MemFetcher {
    fn fetch_keys(
        &self,
        signal: CancellationSignal,
    ) -> BoxFut<'_, BfResult<Vec<Key>>> {
        Box::pin(async move {
            self.wait_latency(&signal).await?;
            let mut keys = self
                .records
                .read()
                .unwrap()
                .keys()
                .copied()
                .collect::<Vec<_>>();
            keys.sort();
            Ok(keys)
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
