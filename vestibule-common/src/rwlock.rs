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

use parking_lot::RwLock;

/// Value cell guarded by a reader/writer lock.
///
/// Readers take snapshots; writers replace or transform the value in place.
pub struct RwCell<T> {
    inner: RwLock<T>,
}

impl<T> RwCell<T>
where
    T: Clone,
{
    pub fn new(value: T) -> Self {
        Self {
            inner: RwLock::new(value),
        }
    }

    /// Snapshot of the current value.
    pub fn read(&self) -> T {
        self.inner.read().clone()
    }

    /// Replace the value.
    pub fn write(&self, value: T) {
        *self.inner.write() = value;
    }

    /// Transform the value under the write lock.
    pub fn update(&self, f: impl FnOnce(T) -> T) {
        let mut guard = self.inner.write();
        *guard = f(guard.clone());
    }

    /// Replace the value only when `condition` holds for the current one.
    pub fn write_if(&self, condition: impl FnOnce(&T) -> bool, value: T) {
        let mut guard = self.inner.write();
        if condition(&guard) {
            *guard = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_read_write() {
        let cell = RwCell::new(1);
        assert_eq!(cell.read(), 1);

        cell.write(2);
        assert_eq!(cell.read(), 2);

        cell.update(|v| v * 10);
        assert_eq!(cell.read(), 20);
    }

    #[test]
    fn test_write_if() {
        let cell = RwCell::new(7);

        cell.write_if(|v| *v > 10, 0);
        assert_eq!(cell.read(), 7);

        cell.write_if(|v| *v == 7, 42);
        assert_eq!(cell.read(), 42);
    }

    #[test]
    fn test_concurrent_updates() {
        let cell = Arc::new(RwCell::new(0u64));

        let handles = (0..4)
            .map(|_| {
                let cell = cell.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        cell.update(|v| v + 1);
                    }
                })
            })
            .collect::<Vec<_>>();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cell.read(), 4000);
    }
}
