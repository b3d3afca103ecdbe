//  Copyright 2025 Vestibule Project Authors
//
//  Licensed under the Apache License, Version 2.0 (the "License");
//  you may not use this file except in compliance with the License.
//  You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.

use std::{
    sync::{atomic::Ordering, Arc},
    time::Duration,
};

use vestibule::{prelude::*, test_utils::RecordingColdStorage};

const WAIT: Duration = Duration::from_secs(1);
const SETTLE: Duration = Duration::from_millis(300);

type Value = Indexed<i32>;
type Cold = Arc<RecordingColdStorage<Value>>;

fn cold() -> Cold {
    Arc::new(RecordingColdStorage::new())
}

fn store_with(cold: &Cold, max_units: usize) -> CachedStore<Value, Cold> {
    CachedStore::new(cold.clone(), cold.clone(), max_units)
}

fn values(pairs: &[(&str, i32)]) -> Vec<Value> {
    pairs
        .iter()
        .map(|(index, value)| Indexed::new(*index, *value))
        .collect()
}

#[test_log::test(tokio::test)]
async fn test_get_after_set_through_cold() {
    let cold = cold();
    let store = store_with(&cold, 10);

    store
        .set(values(&[("1", 1), ("2", 2), ("3", 3)]))
        .await
        .unwrap();
    assert_eq!(cold.collect_stored(3, WAIT).await.len(), 3);

    let hits = store.get(&["1", "2", "3"]).await.unwrap();
    assert_eq!(hits["1"].value, 1);
    assert_eq!(hits["2"].value, 2);
    assert_eq!(hits["3"].value, 3);

    store.close().await;
}

#[test_log::test(tokio::test)]
async fn test_evicts_least_read_first() {
    let cold = cold();
    let store = store_with(&cold, 4);

    store
        .set(values(&[("1", 1), ("2", 2), ("3", 3)]))
        .await
        .unwrap();
    assert_eq!(cold.collect_stored(3, WAIT).await.len(), 3);
    store.get(&["1", "2", "3"]).await.unwrap();
    store.get(&["1", "2", "3"]).await.unwrap();

    // The two fresh entries have the lowest read counts; one of them goes.
    store.set(values(&[("5", 0), ("6", 0)])).await.unwrap();

    let trashed = cold.collect_trashed(1, WAIT).await;
    assert_eq!(trashed.len(), 1);
    assert_eq!(trashed[0].value, 0);
}

#[test_log::test(tokio::test)]
async fn test_evicts_oldest_on_tied_counts() {
    let cold = cold();
    let store = store_with(&cold, 4);

    store
        .set(values(&[("1", 1), ("2", 2), ("3", 3)]))
        .await
        .unwrap();
    assert_eq!(cold.collect_stored(3, WAIT).await.len(), 3);
    store.get(&["1", "2", "3"]).await.unwrap();
    store.get(&["1", "2", "3"]).await.unwrap();

    store.set(values(&[("5", 0), ("6", 0)])).await.unwrap();
    // Let the write batch land in memory before reading it back.
    tokio::task::yield_now().await;
    store.get(&["5", "6"]).await.unwrap();
    store.get(&["5", "6"]).await.unwrap();

    // All counts now tie, so insertion order breaks the tie: the oldest entry
    // loses its slot, not the fresh zero-valued ones.
    let trashed = cold.collect_trashed(2, SETTLE).await;
    assert_eq!(trashed.len(), 1);
    assert_ne!(trashed[0].value, 0);
}

#[test_log::test(tokio::test)]
async fn test_over_evicts_a_fifth_of_capacity() {
    let cold = cold();
    let store = store_with(&cold, 10);

    let warmup = (1..=10)
        .map(|i| Indexed::new(i.to_string(), i))
        .collect::<Vec<_>>();
    store.set(warmup).await.unwrap();
    assert_eq!(cold.collect_stored(10, WAIT).await.len(), 10);

    store.set(values(&[("11", 11)])).await.unwrap();

    // Overflow of one plus 20% of capacity.
    let trashed = cold.collect_trashed(4, SETTLE).await;
    assert_eq!(trashed.len(), 3);
}

#[test_log::test(tokio::test)]
async fn test_unpersisted_entries_survive_eviction() {
    let cold = cold();
    let store = store_with(&cold, 4);
    cold.set_failing(true);

    let batch = (1..=6)
        .map(|i| Indexed::new(i.to_string(), i))
        .collect::<Vec<_>>();
    store.set(batch).await.unwrap();

    // Nothing is persisted, so nothing may be trashed even over capacity.
    let trashed = cold.collect_trashed(1, SETTLE).await;
    assert!(trashed.is_empty());
    assert_eq!(store.len(), 6);
}

#[test_log::test(tokio::test)]
async fn test_cold_hits_are_reinserted_without_write_back() {
    let cold = cold();
    let store = store_with(&cold, 10);

    store.set(values(&[("1", 1)])).await.unwrap();
    assert_eq!(cold.collect_stored(1, WAIT).await.len(), 1);

    // A fresh store over the same cold storage: the first read is a cold hit.
    let revived = store_with(&cold, 10);
    let hits = revived.get(&["1"]).await.unwrap();
    assert_eq!(hits["1"].value, 1);

    // The hit is cached for later reads but never written back to cold.
    tokio::task::yield_now().await;
    assert_eq!(revived.len(), 1);
    assert!(cold.collect_stored(1, SETTLE).await.is_empty());
}

#[test_log::test(tokio::test)]
async fn test_missing_everywhere_is_omitted() {
    let cold = cold();
    let store = store_with(&cold, 10);

    store.set(values(&[("1", 1)])).await.unwrap();
    assert_eq!(cold.collect_stored(1, WAIT).await.len(), 1);

    let hits = store.get(&["1", "404"]).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert!(!hits.contains_key("404"));
}

#[test_log::test(tokio::test)]
async fn test_cold_read_failure_fails_get() {
    let cold = cold();
    let store = store_with(&cold, 10);
    cold.set_failing(true);

    let err = store.get(&["404"]).await.unwrap_err();
    assert!(matches!(err, Error::ColdStorage(_)));
}

#[test_log::test(tokio::test)]
async fn test_metrics_track_hits_and_misses() {
    let cold = cold();
    let store = store_with(&cold, 10);

    store.set(values(&[("1", 1)])).await.unwrap();
    assert_eq!(cold.collect_stored(1, WAIT).await.len(), 1);

    store.get(&["1"]).await.unwrap();
    store.get(&["404"]).await.unwrap();

    assert_eq!(store.metrics().hit.load(Ordering::Relaxed), 1);
    assert_eq!(store.metrics().miss.load(Ordering::Relaxed), 1);
    assert_eq!(store.metrics().insert.load(Ordering::Relaxed), 1);
}

#[test_log::test(tokio::test)]
async fn test_set_after_close_errors() {
    let cold = cold();
    let store = store_with(&cold, 4);

    store.set(values(&[("1", 1)])).await.unwrap();
    store.close().await;

    let err = store.set(values(&[("2", 2)])).await.unwrap_err();
    assert!(matches!(err, Error::Shutdown));
}

#[test_log::test(tokio::test)]
async fn test_parent_cancellation_stops_workers() {
    let cold = cold();
    let parent = CancellationToken::new();
    let store = CachedStoreBuilder::new(cold.clone(), cold.clone(), 4)
        .with_channel_capacity(8)
        .with_cancellation(parent.clone())
        .build();

    store.set(values(&[("1", 1)])).await.unwrap();
    assert_eq!(cold.collect_stored(1, WAIT).await.len(), 1);

    parent.cancel();
    let err = store.set(values(&[("2", 2)])).await.unwrap_err();
    assert!(matches!(err, Error::Shutdown));
}
