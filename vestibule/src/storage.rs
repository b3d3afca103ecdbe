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

use std::{collections::HashMap, future::Future};

use vestibule_common::code::Indexable;
use vestibule_memory::entry::EntryReader;

use crate::error::Result;

/// Durable backing storage supplied by the embedder.
///
/// The cache hands entries out as read-only views, so the store can snapshot
/// values but never mutate them. Write errors are the store's to surface
/// through its own channels; the cache neither retries nor propagates them.
pub trait ColdStorage<T>: Send + Sync + 'static
where
    T: Indexable,
{
    /// Durably write a batch of entries.
    fn store(&self, entries: Vec<EntryReader<T>>) -> impl Future<Output = Result<()>> + Send;

    /// Read a batch of indices. Missing indices may simply be left out of the
    /// returned map.
    fn fetch(&self, indices: Vec<String>) -> impl Future<Output = Result<HashMap<String, T>>> + Send;
}

/// Disposal sink for evicted values.
///
/// Called from the evictor; implementations should return promptly or be
/// internally asynchronous.
pub trait Trash<T>: Send + Sync + 'static
where
    T: Indexable,
{
    /// Accept a batch of values that just left the in-memory set.
    fn trash(&self, values: Vec<T>) -> impl Future<Output = ()> + Send;
}
