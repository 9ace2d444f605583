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


//! Backend selection from configuration

use crate::error::StoreError;
use crate::memory::MemoryStore;
use crate::rocks::RocksStore;
use crate::store::{KvStore, ReadTxn, WriteTxn};
use keystamp_core::StoreConfig;

/// The store a [`StoreConfig`] describes: RocksDB when a data directory is
/// set, memory otherwise
pub enum StoreBackend {
    Memory(MemoryStore),
    Rocks(RocksStore),
}

impl StoreBackend {
    pub fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        match &config.path {
            Some(path) => Ok(Self::Rocks(
                RocksStore::open(path, &config.namespace)?.with_sync_writes(config.sync_writes),
            )),
            None => Ok(Self::Memory(MemoryStore::in_memory(&config.namespace)?)),
        }
    }

    /// Another handle on the same state, bound to `namespace`
    pub fn with_namespace(&self, namespace: &str) -> Result<Self, StoreError> {
        match self {
            Self::Memory(store) => store.with_namespace(namespace).map(Self::Memory),
            Self::Rocks(store) => store.with_namespace(namespace).map(Self::Rocks),
        }
    }

    pub fn namespaces(&self) -> Vec<String> {
        match self {
            Self::Memory(store) => store.namespaces(),
            Self::Rocks(store) => store.namespaces(),
        }
    }

    pub fn close(&self) {
        match self {
            Self::Memory(store) => store.close(),
            Self::Rocks(store) => store.close(),
        }
    }

    pub fn reopen(&self) -> Result<(), StoreError> {
        match self {
            Self::Memory(store) => store.reopen(),
            Self::Rocks(store) => store.reopen(),
        }
    }
}

impl KvStore for StoreBackend {
    fn namespace(&self) -> &str {
        match self {
            Self::Memory(store) => store.namespace(),
            Self::Rocks(store) => store.namespace(),
        }
    }

    fn is_open(&self) -> bool {
        match self {
            Self::Memory(store) => store.is_open(),
            Self::Rocks(store) => store.is_open(),
        }
    }

    fn view<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&dyn ReadTxn) -> Result<T, E>,
        E: From<StoreError>,
    {
        match self {
            Self::Memory(store) => store.view(f),
            Self::Rocks(store) => store.view(f),
        }
    }

    fn update<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn WriteTxn) -> Result<T, E>,
        E: From<StoreError>,
    {
        match self {
            Self::Memory(store) => store.update(f),
            Self::Rocks(store) => store.update(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_path_selects_rocksdb() {
        let dir = TempDir::new().unwrap();
        let mut config = StoreConfig::at_path(dir.path().join("db"));
        config.namespace = "alerts".into();

        let backend = StoreBackend::open(&config).unwrap();
        assert!(matches!(backend, StoreBackend::Rocks(_)));
        assert_eq!(backend.namespace(), "alerts");
        assert!(dir.path().join("db").join("CURRENT").exists());
    }

    #[test]
    fn test_no_path_selects_memory() {
        let backend = StoreBackend::open(&StoreConfig::in_memory("events")).unwrap();
        assert!(matches!(backend, StoreBackend::Memory(_)));
        assert_eq!(backend.namespaces(), vec!["events"]);
    }
}
