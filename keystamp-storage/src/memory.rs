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

//! Snapshot-isolated in-memory store
//!
//! The committed state is a map of namespaces, each an `Arc<BTreeMap>`.
//! Readers clone the namespace `Arc` and keep a consistent snapshot for as
//! long as their transaction runs. The single writer buffers its puts and
//! deletes and applies them on commit; `Arc::make_mut` copies a namespace only
//! while some reader still holds the previous snapshot of it.

use crate::error::StoreError;
use crate::store::{Cursor, KeyValue, KvStore, ReadTxn, WriteTxn};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

type Bucket = BTreeMap<Vec<u8>, Vec<u8>>;

/// One buffered write; `None` deletes
type PendingWrite = (Vec<u8>, Option<Vec<u8>>);

struct Shared {
    buckets: RwLock<HashMap<String, Arc<Bucket>>>,
    writer: Mutex<()>,
    open: AtomicBool,
}

/// In-memory [`KvStore`] bound to one namespace.
///
/// Handles created with [`MemoryStore::with_namespace`] share the same
/// underlying state and writer lock. Nothing survives the last handle.
pub struct MemoryStore {
    shared: Arc<Shared>,
    namespace: String,
}

impl MemoryStore {
    /// Empty store holding the single namespace `namespace`
    pub fn in_memory(namespace: &str) -> Result<Self, StoreError> {
        let store = Self {
            shared: Arc::new(Shared {
                buckets: RwLock::new(HashMap::new()),
                writer: Mutex::new(()),
                open: AtomicBool::new(true),
            }),
            namespace: namespace.to_string(),
        };
        store.create_namespace();
        info!(namespace = %store.namespace, "In-memory store opened");
        Ok(store)
    }

    /// Another handle on the same state, bound to `namespace`
    pub fn with_namespace(&self, namespace: &str) -> Result<Self, StoreError> {
        let store = Self {
            shared: Arc::clone(&self.shared),
            namespace: namespace.to_string(),
        };
        store.create_namespace();
        Ok(store)
    }

    /// Names of every namespace in the store
    pub fn namespaces(&self) -> Vec<String> {
        let mut names: Vec<String> = self.shared.buckets.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Stop serving transactions on every handle sharing this state
    pub fn close(&self) {
        self.shared.open.store(false, Ordering::SeqCst);
        info!(namespace = %self.namespace, "Store closed");
    }

    /// Make a closed store usable again; the contents are kept
    pub fn reopen(&self) -> Result<(), StoreError> {
        self.shared.open.store(true, Ordering::SeqCst);
        info!(namespace = %self.namespace, "Store reopened");
        Ok(())
    }

    fn create_namespace(&self) {
        let mut buckets = self.shared.buckets.write();
        if !buckets.contains_key(&self.namespace) {
            buckets.insert(self.namespace.clone(), Arc::new(Bucket::new()));
            debug!(namespace = %self.namespace, "Namespace created");
        }
    }

    fn check_open(&self) -> Result<(), StoreError> {
        if self.is_open() {
            Ok(())
        } else {
            Err(StoreError::Closed(self.namespace.clone()))
        }
    }

    fn snapshot(&self) -> Result<Arc<Bucket>, StoreError> {
        self.shared
            .buckets
            .read()
            .get(&self.namespace)
            .cloned()
            .ok_or_else(|| StoreError::NamespaceNotFound(self.namespace.clone()))
    }
}

impl KvStore for MemoryStore {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn is_open(&self) -> bool {
        self.shared.open.load(Ordering::SeqCst)
    }

    fn view<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&dyn ReadTxn) -> Result<T, E>,
        E: From<StoreError>,
    {
        self.check_open()?;
        let bucket = self.snapshot()?;
        let txn = MemoryReadTxn {
            namespace: &self.namespace,
            bucket: &bucket,
        };
        f(&txn)
    }

    fn update<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn WriteTxn) -> Result<T, E>,
        E: From<StoreError>,
    {
        self.check_open()?;
        let _writer = self.shared.writer.lock();
        let mut txn = MemoryWriteTxn {
            namespace: &self.namespace,
            pending: Vec::new(),
        };
        let result = f(&mut txn)?;

        if !txn.pending.is_empty() {
            let mut buckets = self.shared.buckets.write();
            let bucket = buckets
                .get_mut(&self.namespace)
                .ok_or_else(|| StoreError::NamespaceNotFound(self.namespace.clone()))?;
            let bucket = Arc::make_mut(bucket);
            for (key, value) in txn.pending {
                match value {
                    Some(value) => {
                        bucket.insert(key, value);
                    }
                    None => {
                        bucket.remove(&key);
                    }
                }
            }
        }
        Ok(result)
    }
}

struct MemoryReadTxn<'a> {
    namespace: &'a str,
    bucket: &'a Bucket,
}

impl ReadTxn for MemoryReadTxn<'_> {
    fn namespace(&self) -> &str {
        self.namespace
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.bucket.get(key).cloned())
    }

    fn cursor(&self) -> Box<dyn Cursor + '_> {
        Box::new(BucketCursor::new(self.bucket))
    }

    fn len(&self) -> Result<usize, StoreError> {
        Ok(self.bucket.len())
    }
}

struct MemoryWriteTxn<'a> {
    namespace: &'a str,
    pending: Vec<PendingWrite>,
}

impl WriteTxn for MemoryWriteTxn<'_> {
    fn namespace(&self) -> &str {
        self.namespace
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.pending.push((key.to_vec(), Some(value.to_vec())));
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StoreError> {
        self.pending.push((key.to_vec(), None));
        Ok(())
    }
}

/// Cursor over a borrowed bucket
struct BucketCursor<'a> {
    bucket: &'a Bucket,
    position: Option<&'a [u8]>,
}

impl<'a> BucketCursor<'a> {
    fn new(bucket: &'a Bucket) -> Self {
        Self {
            bucket,
            position: None,
        }
    }

    fn settle(&mut self, entry: Option<(&'a Vec<u8>, &'a Vec<u8>)>) -> Option<KeyValue<'a>> {
        match entry {
            Some((key, value)) => {
                self.position = Some(key.as_slice());
                Some((key.as_slice(), value.as_slice()))
            }
            None => {
                self.position = None;
                None
            }
        }
    }
}

impl Cursor for BucketCursor<'_> {
    fn seek(&mut self, key: &[u8]) -> Option<KeyValue<'_>> {
        let bucket = self.bucket;
        let entry = bucket
            .range::<[u8], _>((Bound::Included(key), Bound::Unbounded))
            .next();
        self.settle(entry)
    }

    fn first(&mut self) -> Option<KeyValue<'_>> {
        let bucket = self.bucket;
        self.settle(bucket.iter().next())
    }

    fn last(&mut self) -> Option<KeyValue<'_>> {
        let bucket = self.bucket;
        self.settle(bucket.iter().next_back())
    }

    fn next(&mut self) -> Option<KeyValue<'_>> {
        let bucket = self.bucket;
        let entry = self.position.and_then(|current| {
            bucket
                .range::<[u8], _>((Bound::Excluded(current), Bound::Unbounded))
                .next()
        });
        self.settle(entry)
    }

    fn prev(&mut self) -> Option<KeyValue<'_>> {
        let bucket = self.bucket;
        let entry = self.position.and_then(|current| {
            bucket
                .range::<[u8], _>((Bound::Unbounded, Bound::Excluded(current)))
                .next_back()
        });
        self.settle(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(store: &MemoryStore, keys: &[&str]) {
        store
            .update(|txn| -> Result<(), StoreError> {
                for key in keys {
                    txn.put(key.as_bytes(), b"v")?;
                }
                Ok(())
            })
            .unwrap();
    }

    fn keys_of(txn: &dyn ReadTxn) -> Vec<String> {
        let mut keys = Vec::new();
        txn.for_each(&mut |k, _| {
            keys.push(String::from_utf8_lossy(k).into_owned());
            Ok(())
        })
        .unwrap();
        keys
    }

    #[test]
    fn test_cursor_walks_both_directions() {
        let store = MemoryStore::in_memory("test").unwrap();
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
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_snapshot_isolation() {
        let store = MemoryStore::in_memory("test").unwrap();
        fill(&store, &["a"]);

        store
            .view(|txn| -> Result<(), StoreError> {
                fill(&store, &["b"]);
                assert_eq!(keys_of(txn), vec!["a"]);
                Ok(())
            })
            .unwrap();

        let keys = store
            .view(|txn| -> Result<_, StoreError> { Ok(keys_of(txn)) })
            .unwrap();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn test_failed_update_rolls_back() {
        let store = MemoryStore::in_memory("test").unwrap();
        fill(&store, &["a"]);

        let result: Result<(), StoreError> = store.update(|txn| {
            txn.put(b"b", b"v")?;
            txn.delete(b"a")?;
            Err(StoreError::NamespaceNotFound("abort".into()))
        });
        assert!(result.is_err());

        let keys = store
            .view(|txn| -> Result<_, StoreError> { Ok(keys_of(txn)) })
            .unwrap();
        assert_eq!(keys, vec!["a"]);
    }

    #[test]
    fn test_commit_without_readers_reuses_bucket() {
        let store = MemoryStore::in_memory("test").unwrap();
        fill(&store, &["a"]);
        let before = Arc::as_ptr(&store.snapshot().unwrap());

        fill(&store, &["b"]);
        let after = store.snapshot().unwrap();
        assert_eq!(Arc::as_ptr(&after), before);
        assert_eq!(after.len(), 2);
    }

    #[test]
    fn test_namespaces_are_isolated() {
        let events = MemoryStore::in_memory("events").unwrap();
        let alerts = events.with_namespace("alerts").unwrap();
        fill(&events, &["e1"]);
        fill(&alerts, &["a1", "a2"]);

        let count = |store: &MemoryStore| {
            store
                .view(|txn| -> Result<_, StoreError> { txn.len() })
                .unwrap()
        };
        assert_eq!(count(&events), 1);
        assert_eq!(count(&alerts), 2);
        assert_eq!(events.namespaces(), vec!["alerts", "events"]);
    }

    #[test]
    fn test_closed_store_rejects_transactions() {
        let store = MemoryStore::in_memory("test").unwrap();
        store.close();
        assert!(!store.is_open());

        let result: Result<usize, StoreError> = store.view(|txn| txn.len());
        assert!(matches!(result, Err(StoreError::Closed(_))));

        store.reopen().unwrap();
        let result: Result<usize, StoreError> = store.view(|txn| txn.len());
        assert_eq!(result.unwrap(), 0);
    }
}
