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

//! Keystamp database handle
//!
//! Ties a record store to the scanner and retention sweeper configured from
//! one [`KeystampConfig`].

use crate::filter::Filter;
use crate::retention::{RetentionMetrics, RetentionStats, RetentionSweeper};
use crate::scanner::{Scanner, SelectQuery};
use keystamp_core::{Element, KeyCodec, KeystampConfig, Result, RuleNode};
use keystamp_storage::{KvStore, MemoryStore, RecordStore, RecoveryPolicy, StoreBackend};
use serde_json::Value;
use std::time::Duration;
use tracing::info;

/// Main Keystamp interface
///
/// Safe to share across threads. Scans run on snapshots and never block
/// writers; writes are serialized by the store.
pub struct Keystamp<S: KvStore = StoreBackend> {
    store: RecordStore<S>,
    scanner: Scanner,
    sweeper: RetentionSweeper,
    config: KeystampConfig,
}

impl Keystamp<StoreBackend> {
    /// Open the store described by `config`: RocksDB in `store.path` when set
    pub fn open(config: KeystampConfig) -> Result<Self> {
        config.validate()?;
        let store = RecordStore::open(&config)?;
        info!(
            namespace = %config.store.namespace,
            path = ?config.store.path,
            "Keystamp opened"
        );
        Ok(Self::with_store(store, config))
    }

    /// Volatile store with default settings and no recovery delay
    pub fn in_memory() -> Result<Self> {
        let config = KeystampConfig::default();
        let backend = StoreBackend::Memory(MemoryStore::in_memory(&config.store.namespace)?);
        let store = RecordStore::new(backend, RecoveryPolicy::immediate());
        Ok(Self::with_store(store, config))
    }
}

impl<S: KvStore> Keystamp<S> {
    pub fn with_store(store: RecordStore<S>, config: KeystampConfig) -> Self {
        let scanner = Scanner::new(config.key.codec());
        let sweeper = RetentionSweeper::with_scanner(scanner.clone());
        Self {
            store,
            scanner,
            sweeper,
            config,
        }
    }

    pub fn config(&self) -> &KeystampConfig {
        &self.config
    }

    pub fn store(&self) -> &RecordStore<S> {
        &self.store
    }

    pub fn codec(&self) -> KeyCodec {
        self.scanner.codec()
    }

    /// Encode a key for `timestamp_ms` and `fields` and store `value` under it.
    ///
    /// Returns the encoded key.
    pub fn insert<F: AsRef<str>>(
        &self,
        timestamp_ms: i64,
        fields: &[F],
        value: impl Into<Vec<u8>>,
    ) -> Result<String> {
        let index = self.codec().encode(timestamp_ms, fields)?;
        self.store
            .set_all(&[Element::new(index.clone(), value)])?;
        Ok(index)
    }

    pub fn get(&self, index: &str) -> Result<Option<Vec<u8>>> {
        self.store.get(index)
    }

    pub fn remove<K: AsRef<str>>(&self, keys: &[K]) -> Result<()> {
        self.store.delete_all(keys)
    }

    pub fn keys(&self) -> Result<Vec<String>> {
        self.store.keys()
    }

    pub fn select(&self, query: &SelectQuery) -> Result<Vec<Element>> {
        self.scanner.select(&self.store, query)
    }

    /// Filter from its JSON form, using the configured mixed-node policy
    pub fn parse_filter(&self, value: Value) -> Result<Filter> {
        Filter::from_json(value, self.config.key.mixed_nodes)
    }

    /// Condition tree from JSON text, using the configured mixed-node policy
    pub fn parse_rules(&self, text: &str) -> Result<RuleNode> {
        RuleNode::parse_json(text, self.config.key.mixed_nodes)
    }

    /// Purge according to the configured retention window
    pub fn purge_expired(&self) -> Result<RetentionStats> {
        self.sweeper.apply(&self.store, &self.config.retention)
    }

    pub fn purge_older_than(&self, window: Duration) -> Result<usize> {
        self.sweeper.purge_older_than(&self.store, window)
    }

    pub fn purge_before(&self, cutoff_ms: i64) -> Result<RetentionStats> {
        self.sweeper.purge_before(&self.store, cutoff_ms)
    }

    pub fn retention_metrics(&self) -> &RetentionMetrics {
        self.sweeper.metrics()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keystamp_core::{KeystampError, TimestampWidth};
    use serde_json::json;

    #[test]
    fn test_insert_and_select() {
        let db = Keystamp::in_memory().unwrap();
        db.insert(10, &["direction", "01"], b"a".to_vec()).unwrap();
        let key = db.insert(20, &["direction", "02"], b"b".to_vec()).unwrap();
        assert_eq!(key, "20;'direction'02;");
        assert_eq!(db.get(&key).unwrap(), Some(b"b".to_vec()));

        let filter = db
            .parse_filter(json!({"field": "direction", "operator": "==", "value": "02"}))
            .unwrap();
        let result = db
            .select(&SelectQuery::range(0, 100).with_filter(filter))
            .unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].index, key);
    }

    #[test]
    fn test_insert_rejects_delimiters() {
        let db = Keystamp::in_memory().unwrap();
        let err = db.insert(1, &["name", "a;b"], b"x".to_vec()).unwrap_err();
        assert!(matches!(err, KeystampError::InvalidKey(_)));
        assert!(db.keys().unwrap().is_empty());
    }

    #[test]
    fn test_fixed_width_config() {
        let mut config = KeystampConfig::default();
        config.key.timestamp_width = TimestampWidth::Fixed(4);
        let store = RecordStore::in_memory("bucket").unwrap();
        let db = Keystamp::with_store(store, config);

        for ts in [9, 10, 100] {
            db.insert(ts, &["n", "x"], b"v".to_vec()).unwrap();
        }
        let result = db.select(&SelectQuery::range(9, 10)).unwrap();
        let indexes: Vec<_> = result.iter().map(|e| e.index.as_str()).collect();
        assert_eq!(indexes, vec!["0009;'n'x;", "0010;'n'x;"]);
    }

    #[test]
    fn test_purge_and_remove() {
        let db = Keystamp::in_memory().unwrap();
        db.insert(5, &["n", "x"], b"v".to_vec()).unwrap();
        let kept = db.insert(50, &["n", "x"], b"v".to_vec()).unwrap();
        assert_eq!(db.purge_before(10).unwrap().records_deleted, 1);
        assert_eq!(db.retention_metrics().to_map()["cleanup_count"], 1);

        db.remove(&[kept.as_str()]).unwrap();
        assert!(db.keys().unwrap().is_empty());
    }
}
