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
    collections::HashMap,
    marker::PhantomData,
    sync::{atomic::Ordering, Arc},
};

use flume::Sender;
use itertools::Itertools;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use vestibule_common::code::Indexable;
use vestibule_memory::{
    entry::{Entry, Persistable},
    queue::IndexedQueue,
};

use crate::{
    error::{Error, Result},
    evictor::Evictor,
    metrics::Metrics,
    persister::Persister,
    storage::{ColdStorage, Trash},
};

/// Default depth of the write and length channels. Producers block when the
/// background workers fall this far behind.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 100;

pub(crate) struct Shared<T, C>
where
    T: Indexable,
    C: ColdStorage<T>,
{
    pub queue: IndexedQueue<Entry<T>>,
    pub cold: C,
    pub max_units: usize,
    pub metrics: Metrics,
}

/// Builder for [`CachedStore`].
pub struct CachedStoreBuilder<T, C, R>
where
    T: Indexable,
    C: ColdStorage<T>,
    R: Trash<T>,
{
    cold: C,
    trash: R,
    max_units: usize,
    channel_capacity: usize,
    cancellation: Option<CancellationToken>,
    _marker: PhantomData<T>,
}

impl<T, C, R> CachedStoreBuilder<T, C, R>
where
    T: Indexable,
    C: ColdStorage<T>,
    R: Trash<T>,
{
    /// Start building a store over the given cold storage and trash sink.
    ///
    /// `max_units` is the soft capacity of the in-memory set; crossing it
    /// triggers eviction down to roughly 80% of the bound.
    ///
    /// # Panics
    ///
    /// Panics if `max_units` is zero.
    pub fn new(cold: C, trash: R, max_units: usize) -> Self {
        assert!(max_units > 0);
        Self {
            cold,
            trash,
            max_units,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            cancellation: None,
            _marker: PhantomData,
        }
    }

    /// Set the bounded depth of the write and length channels.
    ///
    /// The default is [`DEFAULT_CHANNEL_CAPACITY`]. The exact value is not
    /// load-bearing; it only bounds how far producers can run ahead of the
    /// workers before blocking.
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Tie the workers to an external cancellation token.
    ///
    /// The store derives a child token, so cancelling the parent tears the
    /// store down while [`CachedStore::close`] leaves the parent untouched.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Spawn the persister and the evictor and return the running store.
    pub fn build(self) -> CachedStore<T, C> {
        let token = self
            .cancellation
            .map(|parent| parent.child_token())
            .unwrap_or_default();
        let (batches_tx, batches_rx) = flume::bounded(self.channel_capacity);
        let (lengths_tx, lengths_rx) = flume::bounded(self.channel_capacity);

        let shared = Arc::new(Shared {
            queue: IndexedQueue::new(),
            cold: self.cold,
            max_units: self.max_units,
            metrics: Metrics::default(),
        });

        let persister = Persister {
            shared: shared.clone(),
            batches: batches_rx,
            lengths: lengths_tx,
            token: token.clone(),
        };
        let evictor = Evictor {
            shared: shared.clone(),
            lengths: lengths_rx,
            trash: self.trash,
            token: token.clone(),
        };

        let handles = vec![tokio::spawn(persister.run()), tokio::spawn(evictor.run())];

        CachedStore {
            shared,
            batches: batches_tx,
            token,
            handles: Mutex::new(handles),
        }
    }
}

/// Write-through cache over an embedder-supplied cold store.
///
/// Writes are buffered in a bounded in-memory set and persisted in the
/// background; reads fall back to cold storage and reinsert what they find.
/// When the set outgrows `max_units`, the least-read persisted entries are
/// evicted to the trash sink.
///
/// A value submitted with [`CachedStore::set`] becomes visible to
/// [`CachedStore::get`] once the persister has absorbed the batch; a get
/// racing the insertion can miss both tiers and omit the key. The cache is an
/// optimization layer, not a read-your-writes queue.
pub struct CachedStore<T, C>
where
    T: Indexable,
    C: ColdStorage<T>,
{
    shared: Arc<Shared<T, C>>,
    batches: Sender<Vec<Persistable<T>>>,
    token: CancellationToken,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl<T, C> CachedStore<T, C>
where
    T: Indexable,
    C: ColdStorage<T>,
{
    /// Build a store with default options.
    pub fn new<R>(cold: C, trash: R, max_units: usize) -> Self
    where
        R: Trash<T>,
    {
        CachedStoreBuilder::new(cold, trash, max_units).build()
    }

    /// Submit values that still need a cold write.
    ///
    /// Blocks only when the write channel is full; returns once the batch is
    /// queued, before it is inserted or persisted.
    pub async fn set(&self, values: Vec<T>) -> Result<()> {
        self.submit(values.into_iter().map(Persistable::unpersisted).collect_vec())
            .await
    }

    /// Submit values cold storage already holds, e.g. after a cold hit. They
    /// are cached without being written back.
    pub async fn set_persisted(&self, values: Vec<T>) -> Result<()> {
        self.submit(values.into_iter().map(Persistable::persisted).collect_vec())
            .await
    }

    /// Look up a batch of indices, consulting cold storage for in-memory
    /// misses.
    ///
    /// Cold hits are returned immediately and scheduled for reinsertion so
    /// later gets stay in memory; indices unknown to both tiers are left out
    /// of the map. A cold read failure fails the whole call.
    pub async fn get<Q>(&self, indices: &[Q]) -> Result<HashMap<String, T>>
    where
        Q: AsRef<str> + Sync,
    {
        let cached = self.shared.queue.get(indices);
        let mut result = HashMap::with_capacity(indices.len());
        let mut missing = Vec::new();
        for index in indices {
            match cached.get(index.as_ref()) {
                Some(entry) => {
                    result.insert(index.as_ref().to_owned(), entry.read());
                }
                None => missing.push(index.as_ref().to_owned()),
            }
        }
        self.shared.metrics.hit.fetch_add(result.len(), Ordering::Relaxed);

        if missing.is_empty() {
            return Ok(result);
        }
        self.shared.metrics.miss.fetch_add(missing.len(), Ordering::Relaxed);

        let persisted = self.shared.cold.fetch(missing).await?;
        if persisted.is_empty() {
            return Ok(result);
        }

        let warm = persisted.values().cloned().collect_vec();
        result.extend(persisted);
        self.set_persisted(warm).await?;

        Ok(result)
    }

    async fn submit(&self, batch: Vec<Persistable<T>>) -> Result<()> {
        if self.token.is_cancelled() {
            return Err(Error::Shutdown);
        }
        self.batches
            .send_async(batch)
            .await
            .map_err(|_| Error::Shutdown)
    }

    /// Entries currently held in memory.
    pub fn len(&self) -> usize {
        self.shared.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Soft capacity of the in-memory set.
    pub fn max_units(&self) -> usize {
        self.shared.max_units
    }

    pub fn metrics(&self) -> &Metrics {
        &self.shared.metrics
    }

    /// Signal both workers to exit without waiting for them.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// Cancel both workers and wait for them to finish.
    ///
    /// In-flight channel items are dropped; unpersisted values among them are
    /// lost. Callers that need durability must confirm through the cold
    /// store.
    pub async fn close(&self) {
        self.token.cancel();
        let handles = self.handles.lock().drain(..).collect_vec();
        for handle in handles {
            let _ = handle.await;
        }
    }
}
