// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Records exchanged with the store

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A stored record: encoded key plus opaque value.
///
/// In a batch write a `None` value is a tombstone and deletes the key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub index: String,
    pub value: Option<Vec<u8>>,
}

impl Element {
    /// Upsert of `value` under `index`
    pub fn new(index: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            index: index.into(),
            value: Some(value.into()),
        }
    }

    /// Delete of `index`
    pub fn tombstone(index: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            value: None,
        }
    }

    pub fn is_tombstone(&self) -> bool {
        self.value.is_none()
    }

    /// Turn this element into a delete of the same key
    pub fn clear(&mut self) {
        self.value = None;
    }
}

/// Build a batch from an index -> value map
pub fn elements_from_map(data: HashMap<String, Option<Vec<u8>>>) -> Vec<Element> {
    data.into_iter()
        .map(|(index, value)| Element { index, value })
        .collect()
}
