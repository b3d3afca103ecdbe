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
    fmt::Debug,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use parking_lot::RwLock;
use vestibule_common::code::Indexable;

struct EntryInner<T> {
    value: RwLock<T>,
    persisted: AtomicBool,
}

/// Shared handle to one live cache entry: a value plus its persistence state.
///
/// Value access is serialized by the entry's reader/writer lock. The
/// `persisted` flag is atomic and read without the lock; the persister stores
/// `true` strictly after the cold write returns, and nothing observes the
/// value and the flag in a single critical section.
///
/// The flag only transitions `false -> true` within one entry's life. A fresh
/// entry is allocated per insertion, so a reset is modeled as a new entry.
pub struct Entry<T> {
    inner: Arc<EntryInner<T>>,
}

impl<T> Clone for Entry<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Entry<T>
where
    T: Indexable,
{
    pub fn new(value: T, persisted: bool) -> Self {
        Self {
            inner: Arc::new(EntryInner {
                value: RwLock::new(value),
                persisted: AtomicBool::new(persisted),
            }),
        }
    }

    /// Snapshot of the current value.
    pub fn read(&self) -> T {
        self.inner.value.read().clone()
    }

    /// Replace the value. The entry becomes unpersisted until the next cold
    /// write acknowledges it.
    pub fn write(&self, value: T) {
        let mut guard = self.inner.value.write();
        *guard = value;
        self.inner.persisted.store(false, Ordering::Release);
    }

    pub fn set_persisted(&self) {
        self.inner.persisted.store(true, Ordering::Release);
    }

    pub fn is_persisted(&self) -> bool {
        self.inner.persisted.load(Ordering::Acquire)
    }

    pub fn index(&self) -> String {
        self.inner.value.read().index()
    }

    /// Read-only view to hand to cold storage.
    pub fn reader(&self) -> EntryReader<T> {
        EntryReader {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Indexable for Entry<T>
where
    T: Indexable,
{
    fn index(&self) -> String {
        Entry::index(self)
    }
}

impl<T> Debug for Entry<T>
where
    T: Indexable,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entry")
            .field("index", &self.index())
            .field("persisted", &self.is_persisted())
            .finish()
    }
}

/// Restricted view of an entry: the holder can snapshot the value but neither
/// mutate it nor touch its persistence flag.
pub struct EntryReader<T> {
    inner: Arc<EntryInner<T>>,
}

impl<T> Clone for EntryReader<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> EntryReader<T>
where
    T: Indexable,
{
    /// Snapshot of the current value.
    pub fn read(&self) -> T {
        self.inner.value.read().clone()
    }

    pub fn index(&self) -> String {
        self.inner.value.read().index()
    }
}

/// Snapshot the values behind a batch of read-only entry views.
pub fn collect<T>(readers: &[EntryReader<T>]) -> Vec<T>
where
    T: Indexable,
{
    readers.iter().map(EntryReader::read).collect()
}

/// A value tagged with whether cold storage already holds it in this form.
#[derive(Debug, Clone)]
pub struct Persistable<T> {
    pub value: T,
    pub persisted: bool,
}

impl<T> Persistable<T>
where
    T: Indexable,
{
    /// Tag a value that still needs a cold write.
    pub fn unpersisted(value: T) -> Self {
        Self {
            value,
            persisted: false,
        }
    }

    /// Tag a value cold storage already acknowledged.
    pub fn persisted(value: T) -> Self {
        Self {
            value,
            persisted: true,
        }
    }

    /// Allocate a fresh entry preloaded with the tag.
    pub fn into_entry(self) -> Entry<T> {
        Entry::new(self.value, self.persisted)
    }
}

#[cfg(test)]
mod tests {
    use vestibule_common::code::Indexed;

    use super::*;

    #[test]
    fn test_read_write_snapshot() {
        let entry = Entry::new(Indexed::new("a", 1), false);
        assert_eq!(entry.read().value, 1);
        assert_eq!(entry.index(), "a");

        let snapshot = entry.read();
        entry.write(Indexed::new("a", 2));
        assert_eq!(snapshot.value, 1);
        assert_eq!(entry.read().value, 2);
    }

    #[test]
    fn test_persisted_transitions() {
        let entry = Entry::new(Indexed::new("a", 1), false);
        assert!(!entry.is_persisted());

        entry.set_persisted();
        assert!(entry.is_persisted());
        entry.set_persisted();
        assert!(entry.is_persisted());

        // A write invalidates the acknowledged state.
        entry.write(Indexed::new("a", 2));
        assert!(!entry.is_persisted());
    }

    #[test]
    fn test_reader_shares_state() {
        let entry = Entry::new(Indexed::new("a", 1), false);
        let reader = entry.reader();

        entry.write(Indexed::new("a", 3));
        assert_eq!(reader.read().value, 3);
        assert_eq!(reader.index(), "a");

        let values = collect(&[entry.reader(), entry.reader()]);
        assert_eq!(values.len(), 2);
        assert_eq!(values[0].value, 3);
    }

    #[test]
    fn test_persistable_into_entry() {
        let fresh = Persistable::unpersisted(Indexed::new("a", 1)).into_entry();
        assert!(!fresh.is_persisted());

        let acknowledged = Persistable::persisted(Indexed::new("b", 2)).into_entry();
        assert!(acknowledged.is_persisted());
        assert_eq!(acknowledged.index(), "b");
    }
}
