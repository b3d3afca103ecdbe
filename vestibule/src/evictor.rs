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

use flume::Receiver;
use itertools::Itertools;
use tokio_util::sync::CancellationToken;
use vestibule_common::code::Indexable;
use vestibule_memory::entry::Entry;

use crate::{
    storage::{ColdStorage, Trash},
    store::Shared,
};

/// Long-running worker that reacts to post-insert length reports.
///
/// When the in-memory set outgrows its bound, the least-read persisted
/// entries are removed and forwarded to the trash sink.
pub(crate) struct Evictor<T, C, R>
where
    T: Indexable,
    C: ColdStorage<T>,
    R: Trash<T>,
{
    pub shared: Arc<Shared<T, C>>,
    pub lengths: Receiver<usize>,
    pub trash: R,
    pub token: CancellationToken,
}

impl<T, C, R> Evictor<T, C, R>
where
    T: Indexable,
    C: ColdStorage<T>,
    R: Trash<T>,
{
    pub async fn run(self) {
        loop {
            let hint = tokio::select! {
                _ = self.token.cancelled() => break,
                hint = self.lengths.recv_async() => match hint {
                    Ok(hint) => hint,
                    Err(_) => break,
                },
            };

            // Length hints are optimistic; trust whichever is larger.
            let current = self.shared.queue.len().max(hint);
            if current <= self.shared.max_units {
                continue;
            }

            // Shed the overflow plus a fifth of the bound, so the next few
            // inserts don't immediately re-trigger eviction.
            let amount = current - self.shared.max_units + self.shared.max_units / 5;
            let evicted = self.evict(amount);
            if evicted.is_empty() {
                continue;
            }

            self.shared.metrics.evict.fetch_add(evicted.len(), Ordering::Relaxed);
            tracing::trace!("[evictor]: evicted {} of requested {amount}", evicted.len());

            let values = evicted.iter().map(Entry::read).collect_vec();
            self.trash.trash(values).await;
        }
        tracing::debug!("[evictor]: exit");
    }

    /// Sorted eviction: the least-read persisted entries leave first.
    ///
    /// Unpersisted entries are never discarded, even when that leaves the set
    /// over capacity. Read counts start fresh afterwards so long-lived
    /// entries cannot become unevictable.
    fn evict(&self, amount: usize) -> Vec<Entry<T>> {
        self.shared.queue.sort_by_read_count();
        let evicted = self.shared.queue.pop_where(Entry::is_persisted, amount);
        self.shared.queue.clear_read_counts();
        evicted
    }
}
