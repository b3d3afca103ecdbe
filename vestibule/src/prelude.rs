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

pub use vestibule_common::{
    code::{Indexable, Indexed},
    rwlock::RwCell,
};
pub use vestibule_memory::{
    entry::{collect, Entry, EntryReader, Persistable},
    queue::IndexedQueue,
};

pub use crate::{
    error::{Error, Result},
    metrics::Metrics,
    storage::{ColdStorage, Trash},
    store::{CachedStore, CachedStoreBuilder, DEFAULT_CHANNEL_CAPACITY},
};
pub use tokio_util::sync::CancellationToken;
