//! Test utilities associated with keys and entities.

use batchfetch_api::{Entity, Key};
use rand::seq::SliceRandom;

/// The entity the [crate::fetcher::TestFetcher] produces for `key`.
pub fn test_entity(key: Key) -> Entity {
    Entity::new(key, format!("entity-{key}").into_bytes())
}

/// Keys `1..=n`, in order.
pub fn key_list(n: usize) -> Vec<Key> {
    (1..=n as i64).map(Key).collect()
}

/// `n` distinct keys in random order.
pub fn random_key_list(n: usize) -> Vec<Key> {
    let mut keys = key_list(n);
    keys.shuffle(&mut rand::thread_rng());
    keys
}

/// Sorted copy of the keys of `entities`, for permutation checks.
pub fn sorted_keys(entities: &[Entity]) -> Vec<Key> {
    let mut keys = entities.iter().map(|e| e.key).collect::<Vec<_>>();
    keys.sort();
    keys
}
