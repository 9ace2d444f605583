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

//! Transactional ordered key-value store contract
//!
//! Keys are ordered byte-lexicographically. A store runs at most one write
//! transaction at a time; read transactions see a point-in-time snapshot and
//! never block the writer.

use crate::error::StoreError;

/// Key and value borrowed from a cursor position
pub type KeyValue<'a> = (&'a [u8], &'a [u8]);

/// Ordered iteration over one transaction's view of a namespace.
///
/// Every move returns the entry the cursor lands on, or `None` past either
/// end. The entry borrows the cursor, so it must be dropped before the next
/// move. Once a move runs off the end the cursor must be repositioned with
/// `seek`, `first` or `last`.
pub trait Cursor {
    /// First entry with a key `>= key`
    fn seek(&mut self, key: &[u8]) -> Option<KeyValue<'_>>;
    fn first(&mut self) -> Option<KeyValue<'_>>;
    fn last(&mut self) -> Option<KeyValue<'_>>;
    fn next(&mut self) -> Option<KeyValue<'_>>;
    fn prev(&mut self) -> Option<KeyValue<'_>>;

    /// Error that ended iteration early, if any
    fn status(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Read access inside a transaction
pub trait ReadTxn {
    fn namespace(&self) -> &str;

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    fn cursor(&self) -> Box<dyn Cursor + '_>;

    fn len(&self) -> Result<usize, StoreError> {
        let mut count = 0;
        self.for_each(&mut |_, _| {
            count += 1;
            Ok(())
        })?;
        Ok(count)
    }

    fn is_empty(&self) -> Result<bool, StoreError> {
        let mut cursor = self.cursor();
        let empty = cursor.first().is_none();
        cursor.status()?;
        Ok(empty)
    }

    /// Visit every entry in key order, stopping at the first error
    fn for_each(
        &self,
        f: &mut dyn FnMut(&[u8], &[u8]) -> Result<(), StoreError>,
    ) -> Result<(), StoreError> {
        let mut cursor = self.cursor();
        let mut entry = cursor.first();
        while let Some((key, value)) = entry {
            f(key, value)?;
            entry = cursor.next();
        }
        cursor.status()
    }
}

/// Buffered writes of one transaction, applied atomically on commit
pub trait WriteTxn {
    fn namespace(&self) -> &str;

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), StoreError>;

    /// Remove `key`; deleting an absent key is not an error
    fn delete(&mut self, key: &[u8]) -> Result<(), StoreError>;
}

/// A handle on one namespace of a transactional store
pub trait KvStore: Send + Sync {
    /// Namespace this handle reads and writes
    fn namespace(&self) -> &str;

    /// Whether the handle can currently run transactions
    fn is_open(&self) -> bool;

    /// Run `f` in a read-only snapshot transaction
    fn view<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&dyn ReadTxn) -> Result<T, E>,
        E: From<StoreError>;

    /// Run `f` in the write transaction; an `Err` from `f` discards every change
    fn update<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn WriteTxn) -> Result<T, E>,
        E: From<StoreError>;
}
