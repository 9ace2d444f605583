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

//! Record plumbing on top of a [`KvStore`]
//!
//! [`RecordStore`] pairs a store handle with the recovery check and exposes
//! the element-level operations used by the query layer: point reads, batch
//! writes where a `None` value deletes, bulk deletes and key enumeration.

use crate::backend::StoreBackend;
use crate::error::StoreError;
use crate::memory::MemoryStore;
use crate::recovery::RecoveryPolicy;
use crate::store::{KvStore, ReadTxn, WriteTxn};
use keystamp_core::{Element, KeystampConfig, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Operation counters
#[derive(Debug, Default)]
pub struct RecordStoreStats {
    pub gets: AtomicU64,
    pub puts: AtomicU64,
    pub deletes: AtomicU64,
    pub views: AtomicU64,
}

impl RecordStoreStats {
    pub fn puts(&self) -> u64 {
        self.puts.load(Ordering::Relaxed)
    }

    pub fn deletes(&self) -> u64 {
        self.deletes.load(Ordering::Relaxed)
    }

    pub fn views(&self) -> u64 {
        self.views.load(Ordering::Relaxed)
    }
}

/// A store handle with the recovery check applied before every operation
pub struct RecordStore<S: KvStore> {
    backend: S,
    recovery: RecoveryPolicy,
    stats: RecordStoreStats,
}

impl RecordStore<StoreBackend> {
    /// Open the store described by `config`: RocksDB when a data directory
    /// is configured, memory otherwise
    pub fn open(config: &KeystampConfig) -> Result<Self> {
        let backend = StoreBackend::open(&config.store)?;
        Ok(Self::new(backend, RecoveryPolicy::from(&config.recovery)))
    }
}

impl RecordStore<MemoryStore> {
    /// Purely in-memory store that never waits for recovery
    pub fn in_memory(namespace: &str) -> Result<Self> {
        Ok(Self::new(
            MemoryStore::in_memory(namespace)?,
            RecoveryPolicy::immediate(),
        ))
    }
}

impl<S: KvStore> RecordStore<S> {
    pub fn new(backend: S, recovery: RecoveryPolicy) -> Self {
        Self {
            backend,
            recovery,
            stats: RecordStoreStats::default(),
        }
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    pub fn namespace(&self) -> &str {
        self.backend.namespace()
    }

    pub fn stats(&self) -> &RecordStoreStats {
        &self.stats
    }

    /// Recovery check on its own
    pub fn ensure_available(&self) -> Result<()> {
        self.recovery.ensure_available(&self.backend)?;
        Ok(())
    }

    /// Read-only snapshot transaction, after the recovery check
    pub fn view<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&dyn ReadTxn) -> Result<T>,
    {
        self.ensure_available()?;
        self.stats.views.fetch_add(1, Ordering::Relaxed);
        self.backend.view(f)
    }

    /// Write transaction, after the recovery check
    pub fn update<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut dyn WriteTxn) -> Result<T>,
    {
        self.ensure_available()?;
        self.backend.update(f)
    }

    /// Value stored under `index`; `None` when absent
    pub fn get(&self, index: &str) -> Result<Option<Vec<u8>>> {
        self.stats.gets.fetch_add(1, Ordering::Relaxed);
        self.view(|txn| Ok(txn.get(index.as_bytes())?))
    }

    /// Apply a batch atomically: `Some` values upsert, `None` values delete
    pub fn set_all(&self, elements: &[Element]) -> Result<()> {
        let (puts, deletes) = self.update(|txn| {
            let mut puts = 0u64;
            let mut deletes = 0u64;
            for element in elements {
                match &element.value {
                    Some(value) => {
                        txn.put(element.index.as_bytes(), value)?;
                        puts += 1;
                    }
                    None => {
                        txn.delete(element.index.as_bytes())?;
                        deletes += 1;
                    }
                }
            }
            Ok((puts, deletes))
        })?;

        self.stats.puts.fetch_add(puts, Ordering::Relaxed);
        self.stats.deletes.fetch_add(deletes, Ordering::Relaxed);
        debug!(
            namespace = self.namespace(),
            puts, deletes, "Batch applied"
        );
        Ok(())
    }

    /// Delete every key in `keys` in one transaction
    pub fn delete_all<K: AsRef<str>>(&self, keys: &[K]) -> Result<()> {
        self.update(|txn| {
            for key in keys {
                txn.delete(key.as_ref().as_bytes())?;
            }
            Ok(())
        })?;
        self.stats
            .deletes
            .fetch_add(keys.len() as u64, Ordering::Relaxed);
        Ok(())
    }

    /// Every key in the namespace, in key order
    pub fn keys(&self) -> Result<Vec<String>> {
        self.view(|txn| {
            let mut keys = Vec::new();
            txn.for_each(&mut |key, _| -> std::result::Result<(), StoreError> {
                keys.push(String::from_utf8_lossy(key).into_owned());
                Ok(())
            })?;
            Ok(keys)
        })
    }

    /// Number of records in the namespace
    pub fn len(&self) -> Result<usize> {
        self.view(|txn| Ok(txn.len()?))
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}
