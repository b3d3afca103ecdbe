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

use std::sync::{atomic::Ordering, Arc};

use flume::{Receiver, Sender};
use itertools::Itertools;
use tokio_util::sync::CancellationToken;
use vestibule_common::code::Indexable;
use vestibule_memory::entry::{Entry, Persistable};

use crate::{storage::ColdStorage, store::Shared};

/// Long-running worker that drains the write channel.
///
/// For each batch: insert fresh entries into the in-memory set, report the
/// post-insert length to the evictor, write the unpersisted part through to
/// cold storage, and mark it persisted once the cold write succeeds.
pub(crate) struct Persister<T, C>
where
    T: Indexable,
    C: ColdStorage<T>,
{
    pub shared: Arc<Shared<T, C>>,
    pub batches: Receiver<Vec<Persistable<T>>>,
    pub lengths: Sender<usize>,
    pub token: CancellationToken,
}

impl<T, C> Persister<T, C>
where
    T: Indexable,
    C: ColdStorage<T>,
{
    pub async fn run(self) {
        loop {
            let batch = tokio::select! {
                _ = self.token.cancelled() => break,
                batch = self.batches.recv_async() => match batch {
                    Ok(batch) => batch,
                    Err(_) => break,
                },
            };
            self.absorb(batch).await;
        }
        tracing::debug!("[persister]: exit");
    }

    async fn absorb(&self, batch: Vec<Persistable<T>>) {
        let before = self.shared.queue.len();
        let total = before + batch.len();

        let entries = batch.into_iter().map(Persistable::into_entry).collect_vec();
        let unpersisted = entries
            .iter()
            .filter(|entry| !entry.is_persisted())
            .cloned()
            .collect_vec();

        tracing::trace!(
            "[persister]: absorb batch of {}, {} unpersisted",
            entries.len(),
            unpersisted.len()
        );

        self.shared.metrics.insert.fetch_add(entries.len(), Ordering::Relaxed);
        self.shared.queue.set(entries);

        // Duplicate keys re-seat in place instead of growing the list, so the
        // true length is at most `total`; the evictor tolerates the
        // overestimate.
        if self.lengths.send_async(total).await.is_err() {
            return;
        }

        if unpersisted.is_empty() {
            return;
        }

        let views = unpersisted.iter().map(Entry::reader).collect_vec();
        match self.shared.cold.store(views).await {
            Ok(()) => {
                for entry in &unpersisted {
                    entry.set_persisted();
                }
            }
            Err(e) => {
                // Left unpersisted, the entries stay ineligible for eviction.
                tracing::warn!(
                    "[persister]: cold write failed for {} entries: {e}",
                    unpersisted.len()
                );
            }
        }
    }
}
