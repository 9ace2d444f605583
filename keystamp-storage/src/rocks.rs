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


//! RocksDB-backed store
//!
//! Each namespace is a column family of one RocksDB instance living in the
//! configured data directory. A write transaction collects its puts and
//! deletes in a [`WriteBatch`] that is applied atomically on commit, so a
//! commit costs only the keys it touches. Read transactions run against a
//! RocksDB snapshot and walk it with a raw iterator, which seeks and steps in
//! both directions natively.
//!
//! The handle can be closed and reopened; closing drops the database (and its
//! directory lock) once running transactions finish.

use crate::error::StoreError;
use crate::store::{Cursor, KeyValue, KvStore, ReadTxn, WriteTxn};
use parking_lot::{Mutex, RwLock};
use rocksdb::{
    ColumnFamily, DBRawIterator, ErrorKind, Options, Snapshot, WriteBatch, WriteOptions, DB,
    DEFAULT_COLUMN_FAMILY_NAME,
};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

struct Shared {
    db: RwLock<Option<DB>>,
    writer: Mutex<()>,
    path: PathBuf,
    namespaces: Mutex<BTreeSet<String>>,
}

/// [`KvStore`] on a RocksDB column family.
///
/// Handles created with [`RocksStore::with_namespace`] share the database,
/// the writer lock and the open/closed state.
pub struct RocksStore {
    shared: Arc<Shared>,
    namespace: String,
    sync_writes: bool,
}

impl RocksStore {
    /// Open (or create) the database in directory `path` with `namespace`
    pub fn open(path: impl AsRef<Path>, namespace: &str) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let mut namespaces = existing_namespaces(&path)?;
        namespaces.insert(namespace.to_string());
        let db = open_db(&path, &namespaces)?;

        info!(
            path = %path.display(),
            namespace,
            namespaces = namespaces.len(),
            "RocksDB store opened"
        );
        Ok(Self {
            shared: Arc::new(Shared {
                db: RwLock::new(Some(db)),
                writer: Mutex::new(()),
                path,
                namespaces: Mutex::new(namespaces),
            }),
            namespace: namespace.to_string(),
            sync_writes: false,
        })
    }

    /// Fsync the write-ahead log on every commit
    pub fn with_sync_writes(mut self, sync_writes: bool) -> Self {
        self.sync_writes = sync_writes;
        self
    }

    /// Another handle on the same database, bound to `namespace`
    pub fn with_namespace(&self, namespace: &str) -> Result<Self, StoreError> {
        {
            let _writer = self.shared.writer.lock();
            let mut guard = self.shared.db.write();
            let db = guard
                .as_mut()
                .ok_or_else(|| StoreError::Closed(namespace.to_string()))?;
            if db.cf_handle(namespace).is_none() {
                db.create_cf(namespace, &Options::default())?;
                debug!(namespace, "Column family created");
            }
            self.shared.namespaces.lock().insert(namespace.to_string());
        }
        Ok(Self {
            shared: Arc::clone(&self.shared),
            namespace: namespace.to_string(),
            sync_writes: self.sync_writes,
        })
    }

    /// Data directory of the database
    pub fn path(&self) -> &Path {
        &self.shared.path
    }

    /// Names of every namespace in the database
    pub fn namespaces(&self) -> Vec<String> {
        self.shared.namespaces.lock().iter().cloned().collect()
    }

    /// Drop the database once running transactions finish; every handle
    /// sharing it reports closed until [`RocksStore::reopen`]
    pub fn close(&self) {
        let _writer = self.shared.writer.lock();
        *self.shared.db.write() = None;
        info!(namespace = %self.namespace, "Store closed");
    }

    /// Open the database again after [`RocksStore::close`]
    pub fn reopen(&self) -> Result<(), StoreError> {
        let _writer = self.shared.writer.lock();
        let mut guard = self.shared.db.write();
        if guard.is_none() {
            let namespaces = self.shared.namespaces.lock().clone();
            *guard = Some(open_db(&self.shared.path, &namespaces)?);
        }
        info!(namespace = %self.namespace, "Store reopened");
        Ok(())
    }

    fn write_options(&self) -> WriteOptions {
        let mut options = WriteOptions::default();
        options.set_sync(self.sync_writes);
        options
    }
}

impl KvStore for RocksStore {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn is_open(&self) -> bool {
        self.shared.db.read().is_some()
    }

    fn view<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&dyn ReadTxn) -> Result<T, E>,
        E: From<StoreError>,
    {
        let guard = self.shared.db.read();
        let db = guard
            .as_ref()
            .ok_or_else(|| StoreError::Closed(self.namespace.clone()))?;
        let cf = column_family(db, &self.namespace)?;

        let txn = RocksReadTxn {
            namespace: &self.namespace,
            cf,
            snapshot: db.snapshot(),
        };
        f(&txn)
    }

    fn update<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn WriteTxn) -> Result<T, E>,
        E: From<StoreError>,
    {
        let _writer = self.shared.writer.lock();
        let guard = self.shared.db.read();
        let db = guard
            .as_ref()
            .ok_or_else(|| StoreError::Closed(self.namespace.clone()))?;
        let cf = column_family(db, &self.namespace)?;

        let mut txn = RocksWriteTxn {
            namespace: &self.namespace,
            cf,
            batch: WriteBatch::default(),
        };
        let result = f(&mut txn)?;

        if !txn.batch.is_empty() {
            let writes = txn.batch.len();
            db.write_opt(txn.batch, &self.write_options()).map_err(|e| {
                warn!(namespace = %self.namespace, error = %e, "Commit failed");
                StoreError::from(e)
            })?;
            debug!(namespace = %self.namespace, writes, "Batch committed");
        }
        Ok(result)
    }
}

struct RocksReadTxn<'a> {
    namespace: &'a str,
    cf: &'a ColumnFamily,
    snapshot: Snapshot<'a>,
}

impl ReadTxn for RocksReadTxn<'_> {
    fn namespace(&self) -> &str {
        self.namespace
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.snapshot.get_cf(self.cf, key)?)
    }

    fn cursor(&self) -> Box<dyn Cursor + '_> {
        Box::new(RocksCursor {
            iter: self.snapshot.raw_iterator_cf(self.cf),
        })
    }
}

struct RocksWriteTxn<'a> {
    namespace: &'a str,
    cf: &'a ColumnFamily,
    batch: WriteBatch,
}

impl WriteTxn for RocksWriteTxn<'_> {
    fn namespace(&self) -> &str {
        self.namespace
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.batch.put_cf(self.cf, key, value);
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StoreError> {
        self.batch.delete_cf(self.cf, key);
        Ok(())
    }
}

/// Raw iterator over a snapshot of one column family
struct RocksCursor<'a> {
    iter: DBRawIterator<'a>,
}

impl RocksCursor<'_> {
    fn entry(&self) -> Option<KeyValue<'_>> {
        if !self.iter.valid() {
            return None;
        }
        Some((self.iter.key()?, self.iter.value()?))
    }
}

impl Cursor for RocksCursor<'_> {
    fn seek(&mut self, key: &[u8]) -> Option<KeyValue<'_>> {
        self.iter.seek(key);
        self.entry()
    }

    fn first(&mut self) -> Option<KeyValue<'_>> {
        self.iter.seek_to_first();
        self.entry()
    }

    fn last(&mut self) -> Option<KeyValue<'_>> {
        self.iter.seek_to_last();
        self.entry()
    }

    fn next(&mut self) -> Option<KeyValue<'_>> {
        if self.iter.valid() {
            self.iter.next();
        }
        self.entry()
    }

    fn prev(&mut self) -> Option<KeyValue<'_>> {
        if self.iter.valid() {
            self.iter.prev();
        }
        self.entry()
    }

    fn status(&self) -> Result<(), StoreError> {
        Ok(self.iter.status()?)
    }
}

fn column_family<'a>(db: &'a DB, namespace: &str) -> Result<&'a ColumnFamily, StoreError> {
    db.cf_handle(namespace)
        .ok_or_else(|| StoreError::NamespaceNotFound(namespace.to_string()))
}

/// Column families already present in the database at `path`
fn existing_namespaces(path: &Path) -> Result<BTreeSet<String>, StoreError> {
    if !path.join("CURRENT").exists() {
        return Ok(BTreeSet::new());
    }
    let names = DB::list_cf(&Options::default(), path).map_err(|e| open_error(path, e))?;
    Ok(names
        .into_iter()
        .filter(|name| name != DEFAULT_COLUMN_FAMILY_NAME)
        .collect())
}

fn open_db(path: &Path, namespaces: &BTreeSet<String>) -> Result<DB, StoreError> {
    fs::create_dir_all(path)?;

    let mut options = Options::default();
    options.create_if_missing(true);
    options.create_missing_column_families(true);

    DB::open_cf(&options, path, namespaces.iter()).map_err(|e| open_error(path, e))
}

fn open_error(path: &Path, e: rocksdb::Error) -> StoreError {
    if matches!(e.kind(), ErrorKind::Corruption) {
        StoreError::Corrupt {
            path: path.to_path_buf(),
            reason: e.into_string(),
        }
    } else {
        StoreError::OpenFailed {
            path: path.to_path_buf(),
            source: e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open(dir: &TempDir, namespace: &str) -> RocksStore {
        RocksStore::open(dir.path().join("db"), namespace).unwrap()
    }

    fn fill(store: &RocksStore, keys: &[&str]) {
        store
            .update(|txn| -> Result<(), StoreError> {
                for key in keys {
                    txn.put(key.as_bytes(), b"v")?;
                }
                Ok(())
            })
            .unwrap();
    }

    fn keys_of(store: &RocksStore) -> Vec<String> {
        store
            .view(|txn| -> Result<_, StoreError> {
                let mut keys = Vec::new();
                txn.for_each(&mut |k, _| {
                    keys.push(String::from_utf8_lossy(k).into_owned());
                    Ok(())
                })?;
                Ok(keys)
            })
            .unwrap()
    }

    #[test]
    fn test_cursor_walks_both_directions() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir, "test");
        fill(&store, &["b", "d", "a", "c"]);

        store
            .view(|txn| -> Result<(), StoreError> {
                let mut cursor = txn.cursor();
                assert_eq!(cursor.first().unwrap().0, b"a");
                assert_eq!(cursor.next().unwrap().0, b"b");
                assert_eq!(cursor.seek(b"bb").unwrap().0, b"c");
                assert_eq!(cursor.prev().unwrap().0, b"b");
                assert_eq!(cursor.last().unwrap().0, b"d");
                assert!(cursor.next().is_none());
                assert!(cursor.prev().is_none());
                assert!(cursor.seek(b"z").is_none());
                assert_eq!(cursor.seek(b"a").unwrap().0, b"a");
                assert!(cursor.prev().is_none());
                cursor.status()
            })
            .unwrap();
    }

    #[test]
    fn test_view_reads_its_snapshot() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir, "test");
        fill(&store, &["a"]);

        store
            .view(|txn| -> Result<(), StoreError> {
                fill(&store, &["b"]);
                assert_eq!(txn.get(b"b")?, None);
                assert_eq!(txn.len()?, 1);
                Ok(())
            })
            .unwrap();
        assert_eq!(keys_of(&store), vec!["a", "b"]);
    }

    #[test]
    fn test_failed_update_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir, "test");
        fill(&store, &["a"]);

        let result: Result<(), StoreError> = store.update(|txn| {
            txn.put(b"b", b"v")?;
            txn.delete(b"a")?;
            Err(StoreError::NamespaceNotFound("abort".into()))
        });
        assert!(result.is_err());
        assert_eq!(keys_of(&store), vec!["a"]);
    }

    #[test]
    fn test_namespaces_are_column_families() {
        let dir = TempDir::new().unwrap();
        let events = open(&dir, "events");
        let alerts = events.with_namespace("alerts").unwrap();
        fill(&events, &["e1"]);
        fill(&alerts, &["a1", "a2"]);

        assert_eq!(keys_of(&events), vec!["e1"]);
        assert_eq!(keys_of(&alerts), vec!["a1", "a2"]);
        assert_eq!(events.namespaces(), vec!["alerts", "events"]);
    }

    #[test]
    fn test_close_and_reopen_keeps_data() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir, "test");
        fill(&store, &["a", "b"]);

        store.close();
        assert!(!store.is_open());
        let result: Result<usize, StoreError> = store.view(|txn| txn.len());
        assert!(matches!(result, Err(StoreError::Closed(_))));

        store.reopen().unwrap();
        assert!(store.is_open());
        assert_eq!(keys_of(&store), vec!["a", "b"]);
    }
}
