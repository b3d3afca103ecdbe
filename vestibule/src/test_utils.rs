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

//! Channel-backed doubles for the cold storage and trash interfaces.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use flume::{Receiver, Sender};
use parking_lot::Mutex;
use vestibule_common::code::Indexable;
use vestibule_memory::entry::EntryReader;

use crate::{
    error::Result,
    storage::{ColdStorage, Trash},
};

/// In-memory cold store that records every write and every trashed value.
///
/// Observations drain through bounded channels, so tests can block on "the
/// persister has written n entries" instead of sleeping.
pub struct RecordingColdStorage<T> {
    inner: Mutex<HashMap<String, T>>,
    stored_tx: Sender<T>,
    stored_rx: Receiver<T>,
    trashed_tx: Sender<T>,
    trashed_rx: Receiver<T>,
    failing: AtomicBool,
}

impl<T> Default for RecordingColdStorage<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RecordingColdStorage<T> {
    pub fn new() -> Self {
        let (stored_tx, stored_rx) = flume::bounded(100);
        let (trashed_tx, trashed_rx) = flume::bounded(100);
        Self {
            inner: Mutex::new(HashMap::new()),
            stored_tx,
            stored_rx,
            trashed_tx,
            trashed_rx,
            failing: AtomicBool::new(false),
        }
    }

    /// Make subsequent reads and writes fail until reset.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    /// True when cold storage holds the index.
    pub fn contains(&self, index: &str) -> bool {
        self.inner.lock().contains_key(index)
    }

    /// Drain up to `max` recorded cold writes, waiting at most `wait`.
    pub async fn collect_stored(&self, max: usize, wait: Duration) -> Vec<T> {
        drain(&self.stored_rx, max, wait).await
    }

    /// Drain up to `max` recorded evictions, waiting at most `wait`.
    pub async fn collect_trashed(&self, max: usize, wait: Duration) -> Vec<T> {
        drain(&self.trashed_rx, max, wait).await
    }
}

async fn drain<T>(rx: &Receiver<T>, max: usize, wait: Duration) -> Vec<T> {
    let deadline = tokio::time::Instant::now() + wait;
    let mut collected = Vec::with_capacity(max);
    while collected.len() < max {
        match tokio::time::timeout_at(deadline, rx.recv_async()).await {
            Ok(Ok(value)) => collected.push(value),
            _ => break,
        }
    }
    collected
}

impl<T> ColdStorage<T> for Arc<RecordingColdStorage<T>>
where
    T: Indexable,
{
    async fn store(&self, entries: Vec<EntryReader<T>>) -> Result<()> {
        if self.failing.load(Ordering::Relaxed) {
            return Err(anyhow::anyhow!("cold storage offline").into());
        }
        let values = entries.iter().map(EntryReader::read).collect::<Vec<_>>();
        {
            let mut inner = self.inner.lock();
            for value in &values {
                inner.insert(value.index(), value.clone());
            }
        }
        for value in values {
            let _ = self.stored_tx.send_async(value).await;
        }
        Ok(())
    }

    async fn fetch(&self, indices: Vec<String>) -> Result<HashMap<String, T>> {
        if self.failing.load(Ordering::Relaxed) {
            return Err(anyhow::anyhow!("cold storage offline").into());
        }
        let inner = self.inner.lock();
        Ok(indices
            .iter()
            .filter_map(|index| inner.get(index).map(|value| (index.clone(), value.clone())))
            .collect())
    }
}

impl<T> Trash<T> for Arc<RecordingColdStorage<T>>
where
    T: Indexable,
{
    async fn trash(&self, values: Vec<T>) {
        for value in values {
            let _ = self.trashed_tx.send_async(value).await;
        }
    }
}
