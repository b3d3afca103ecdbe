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

use std::sync::atomic::AtomicUsize;

/// Store counters.
///
/// Counters are monotonic and updated with relaxed ordering; they are
/// observability hints, not synchronization.
#[derive(Debug, Default)]
pub struct Metrics {
    /// Reads served from the in-memory set.
    pub hit: AtomicUsize,
    /// Reads that had to consult cold storage.
    pub miss: AtomicUsize,
    /// Entries absorbed by the persister.
    pub insert: AtomicUsize,
    /// Entries evicted to the trash sink.
    pub evict: AtomicUsize,
}
