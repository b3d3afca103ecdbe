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

use std::sync::atomic::{AtomicU32, Ordering};

use hashbrown::HashMap;
use itertools::Itertools;
use parking_lot::RwLock;
use vestibule_common::code::Indexable;

type NodeId = usize;

struct Node<T> {
    value: T,
    prev: Option<NodeId>,
    next: Option<NodeId>,
}

/// Insertion-ordered doubly linked list over an arena of slots.
///
/// Node ids are stable until the node is removed; relinking is O(1). Freed
/// slots are recycled by later pushes.
struct NodeList<T> {
    slots: Vec<Option<Node<T>>>,
    free: Vec<NodeId>,
    head: Option<NodeId>,
    tail: Option<NodeId>,
    len: usize,
}

impl<T> NodeList<T> {
    fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    fn node(&self, id: NodeId) -> &Node<T> {
        self.slots[id].as_ref().unwrap()
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node<T> {
        self.slots[id].as_mut().unwrap()
    }

    fn front(&self) -> Option<NodeId> {
        self.head
    }

    fn next(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).next
    }

    fn prev(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).prev
    }

    fn len(&self) -> usize {
        self.len
    }

    fn push_back(&mut self, value: T) -> NodeId {
        let node = Node {
            value,
            prev: self.tail,
            next: None,
        };
        let id = match self.free.pop() {
            Some(id) => {
                self.slots[id] = Some(node);
                id
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        };
        match self.tail {
            Some(tail) => self.node_mut(tail).next = Some(id),
            None => self.head = Some(id),
        }
        self.tail = Some(id);
        self.len += 1;
        id
    }

    /// Detach `id` from its neighbors without freeing its slot.
    fn unlink(&mut self, id: NodeId) {
        let (prev, next) = {
            let node = self.node(id);
            (node.prev, node.next)
        };
        match prev {
            Some(prev) => self.node_mut(prev).next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.node_mut(next).prev = prev,
            None => self.tail = prev,
        }
    }

    fn remove(&mut self, id: NodeId) -> T {
        self.unlink(id);
        let node = self.slots[id].take().unwrap();
        self.free.push(id);
        self.len -= 1;
        node.value
    }

    /// Relink `id` immediately before `target`.
    fn move_before(&mut self, id: NodeId, target: NodeId) {
        if id == target {
            return;
        }
        self.unlink(id);
        let prev = self.node(target).prev;
        {
            let node = self.node_mut(id);
            node.prev = prev;
            node.next = Some(target);
        }
        match prev {
            Some(prev) => self.node_mut(prev).next = Some(id),
            None => self.head = Some(id),
        }
        self.node_mut(target).prev = Some(id);
    }
}

struct Tracker {
    node: NodeId,
    reads: AtomicU32,
}

struct QueueInner<T> {
    indexed: HashMap<String, Tracker>,
    list: NodeList<T>,
}

impl<T> QueueInner<T>
where
    T: Indexable,
{
    fn read_count(&self, id: NodeId) -> u32 {
        self.indexed[&self.list.node(id).value.index()]
            .reads
            .load(Ordering::Relaxed)
    }
}

/// Indexed, insertion-ordered collection with per-entry access counters.
///
/// The hash map and the linked list are kept in lockstep under a single
/// reader/writer lock: lookups take the shared lock, structural changes take
/// the exclusive lock. Access counters are atomic so concurrent [`get`]s bump
/// them without contending on the writer side.
///
/// [`get`]: IndexedQueue::get
pub struct IndexedQueue<T> {
    inner: RwLock<QueueInner<T>>,
}

impl<T> Default for IndexedQueue<T>
where
    T: Indexable,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> IndexedQueue<T>
where
    T: Indexable,
{
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(QueueInner {
                indexed: HashMap::new(),
                list: NodeList::new(),
            }),
        }
    }

    /// Insert a batch. An already-present index re-seats the existing element
    /// in place and counts as one access; a new index is appended to the back
    /// with an access count of one.
    pub fn set(&self, values: Vec<T>) {
        let mut inner = self.inner.write();
        let QueueInner { indexed, list } = &mut *inner;
        for value in values {
            let index = value.index();
            match indexed.get(&index) {
                Some(tracker) => {
                    tracker.reads.fetch_add(1, Ordering::Relaxed);
                    list.node_mut(tracker.node).value = value;
                }
                None => {
                    let node = list.push_back(value);
                    indexed.insert(
                        index,
                        Tracker {
                            node,
                            reads: AtomicU32::new(1),
                        },
                    );
                }
            }
        }
    }

    /// Look up a batch of indices, bumping each hit's access count. Missing
    /// indices are left out of the result.
    pub fn get<Q>(&self, indices: &[Q]) -> HashMap<String, T>
    where
        Q: AsRef<str>,
    {
        let inner = self.inner.read();
        let mut hits = HashMap::with_capacity(indices.len());
        for index in indices {
            if let Some(tracker) = inner.indexed.get(index.as_ref()) {
                tracker.reads.fetch_add(1, Ordering::Relaxed);
                hits.insert(
                    index.as_ref().to_owned(),
                    inner.list.node(tracker.node).value.clone(),
                );
            }
        }
        hits
    }

    /// Snapshot the access counts for the given indices without touching them.
    pub fn read_write_counts<Q>(&self, indices: &[Q]) -> HashMap<String, u32>
    where
        Q: AsRef<str>,
    {
        let inner = self.inner.read();
        indices
            .iter()
            .filter_map(|index| {
                inner
                    .indexed
                    .get(index.as_ref())
                    .map(|tracker| (index.as_ref().to_owned(), tracker.reads.load(Ordering::Relaxed)))
            })
            .collect()
    }

    /// Access counts in current list order, front to back.
    pub fn ordered_read_write_counts(&self) -> Vec<u32> {
        let inner = self.inner.read();
        std::iter::successors(inner.list.front(), |&id| inner.list.next(id))
            .map(|id| inner.read_count(id))
            .collect_vec()
    }

    /// Unlink and drop the entries at the given indices. Returns how many were
    /// present.
    pub fn remove<Q>(&self, indices: &[Q]) -> usize
    where
        Q: AsRef<str>,
    {
        let mut inner = self.inner.write();
        let QueueInner { indexed, list } = &mut *inner;
        let mut removed = 0;
        for index in indices {
            if let Some(tracker) = indexed.remove(index.as_ref()) {
                list.remove(tracker.node);
                removed += 1;
            }
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.inner.read().list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove and return up to `amount` elements from the front.
    pub fn pop(&self, amount: usize) -> Vec<T> {
        let mut inner = self.inner.write();
        let QueueInner { indexed, list } = &mut *inner;
        let mut popped = Vec::new();
        while popped.len() < amount {
            let Some(id) = list.front() else {
                break;
            };
            let value = list.remove(id);
            indexed.remove(&value.index());
            popped.push(value);
        }
        popped
    }

    /// Traverse front to back and remove the first `amount` elements that
    /// satisfy `predicate`, in traversal order.
    pub fn pop_where(&self, predicate: impl Fn(&T) -> bool, amount: usize) -> Vec<T> {
        let mut inner = self.inner.write();
        let QueueInner { indexed, list } = &mut *inner;
        let mut popped = Vec::new();
        let mut cursor = list.front();
        while let Some(id) = cursor {
            if popped.len() == amount {
                break;
            }
            cursor = list.next(id);
            if predicate(&list.node(id).value) {
                let value = list.remove(id);
                indexed.remove(&value.index());
                popped.push(value);
            }
        }
        popped
    }

    /// Reorder the list so access counts are non-decreasing front to back.
    ///
    /// Insertion sort by repeated swaps with the predecessor: O(n) on already
    /// sorted input, stable for equal counts.
    pub fn sort_by_read_count(&self) {
        let mut inner = self.inner.write();
        let Some(front) = inner.list.front() else {
            return;
        };
        let mut cursor = inner.list.next(front);
        while let Some(id) = cursor {
            cursor = inner.list.next(id);
            while let Some(prev) = inner.list.prev(id) {
                if inner.read_count(prev) <= inner.read_count(id) {
                    break;
                }
                inner.list.move_before(id, prev);
            }
        }
    }

    /// Zero every access counter, so the next eviction window is scored
    /// fresh.
    pub fn clear_read_counts(&self) {
        let inner = self.inner.write();
        for tracker in inner.indexed.values() {
            tracker.reads.store(0, Ordering::Relaxed);
        }
    }
}
