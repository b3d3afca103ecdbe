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

use serde::{Deserialize, Serialize};

/// Element contract for values held by the cache.
///
/// The index must be stable and non-empty for the lifetime of the value. Two
/// values reporting the same index are treated as the same entry.
pub trait Indexable: Send + Sync + Clone + 'static {
    fn index(&self) -> String;
}

/// Plain wrapper that pairs an arbitrary payload with its index, for payload
/// types that do not carry a natural key of their own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Indexed<T> {
    index: String,
    pub value: T,
}

impl<T> Indexed<T> {
    pub fn new(index: impl Into<String>, value: T) -> Self {
        Self {
            index: index.into(),
            value,
        }
    }
}

impl<T> Indexable for Indexed<T>
where
    T: Send + Sync + Clone + 'static,
{
    fn index(&self) -> String {
        self.index.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indexed_roundtrip() {
        let indexed = Indexed::new("114", 514);
        assert_eq!(indexed.index(), "114");
        assert_eq!(indexed.value, 514);

        let raw = serde_json::to_string(&indexed).unwrap();
        let back: Indexed<i32> = serde_json::from_str(&raw).unwrap();
        assert_eq!(back, indexed);
    }
}
