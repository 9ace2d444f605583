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

//! Rolling retention
//!
//! Purging is a plain ascending scan from the epoch to the cutoff followed by
//! a single batch that tombstones every record found.

use crate::scanner::{Scanner, SelectQuery};
use keystamp_core::{KeyCodec, Result, RetentionConfig};
use keystamp_storage::{KvStore, RecordStore};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Outcome of one purge
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionStats {
    pub records_deleted: usize,
    /// Records stamped at or before this instant were removed (epoch ms)
    pub cutoff_ms: i64,
    pub cleanup_duration_ms: u64,
}

#[derive(Debug, Default)]
pub struct RetentionMetrics {
    /// Total records deleted since startup
    pub total_records_deleted: AtomicU64,
    /// Total purges performed
    pub cleanup_count: AtomicU64,
    pub cleanup_failures: AtomicU64,
    /// Wall clock of the last purge (epoch ms)
    pub last_cleanup_ms: AtomicU64,
    pub last_cleanup_duration_ms: AtomicU64,
}

impl RetentionMetrics {
    pub fn record_cleanup(&self, stats: &RetentionStats) {
        self.total_records_deleted
            .fetch_add(stats.records_deleted as u64, Ordering::Relaxed);
        self.cleanup_count.fetch_add(1, Ordering::Relaxed);
        self.last_cleanup_ms
            .store(now_millis().max(0) as u64, Ordering::Relaxed);
        self.last_cleanup_duration_ms
            .store(stats.cleanup_duration_ms, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.cleanup_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Metrics keyed by name
    pub fn to_map(&self) -> HashMap<String, u64> {
        let mut map = HashMap::new();
        map.insert(
            "total_records_deleted".to_string(),
            self.total_records_deleted.load(Ordering::Relaxed),
        );
        map.insert(
            "cleanup_count".to_string(),
            self.cleanup_count.load(Ordering::Relaxed),
        );
        map.insert(
            "cleanup_failures".to_string(),
            self.cleanup_failures.load(Ordering::Relaxed),
        );
        map.insert(
            "last_cleanup_ms".to_string(),
            self.last_cleanup_ms.load(Ordering::Relaxed),
        );
        map.insert(
            "last_cleanup_duration_ms".to_string(),
            self.last_cleanup_duration_ms.load(Ordering::Relaxed),
        );
        map
    }
}

/// Deletes records that fell out of the retention window
#[derive(Default)]
pub struct RetentionSweeper {
    scanner: Scanner,
    metrics: RetentionMetrics,
}

impl RetentionSweeper {
    pub fn new(codec: KeyCodec) -> Self {
        Self::with_scanner(Scanner::new(codec))
    }

    pub fn with_scanner(scanner: Scanner) -> Self {
        Self {
            scanner,
            metrics: RetentionMetrics::default(),
        }
    }

    pub fn metrics(&self) -> &RetentionMetrics {
        &self.metrics
    }

    /// Delete every record stamped at or before now minus `window`.
    ///
    /// Returns the number of records deleted.
    pub fn purge_older_than<S: KvStore>(
        &self,
        store: &RecordStore<S>,
        window: Duration,
    ) -> Result<usize> {
        let window_ms = i64::try_from(window.as_millis()).unwrap_or(i64::MAX);
        let cutoff_ms = now_millis().saturating_sub(window_ms);
        Ok(self.purge_before(store, cutoff_ms)?.records_deleted)
    }

    /// Delete every record stamped in `[0, cutoff_ms]` in one batch
    pub fn purge_before<S: KvStore>(
        &self,
        store: &RecordStore<S>,
        cutoff_ms: i64,
    ) -> Result<RetentionStats> {
        let started = Instant::now();
        let mut stats = RetentionStats {
            cutoff_ms,
            ..Default::default()
        };
        if cutoff_ms < 0 {
            return Ok(stats);
        }

        let result = self
            .scanner
            .select(store, &SelectQuery::range(0, cutoff_ms))
            .and_then(|mut expired| {
                if expired.is_empty() {
                    return Ok(0);
                }
                expired.iter_mut().for_each(|element| element.clear());
                store.set_all(&expired)?;
                Ok(expired.len())
            });

        match result {
            Ok(deleted) => {
                stats.records_deleted = deleted;
                stats.cleanup_duration_ms = started.elapsed().as_millis() as u64;
                self.metrics.record_cleanup(&stats);
                info!(
                    namespace = store.namespace(),
                    deleted,
                    cutoff_ms,
                    duration_ms = stats.cleanup_duration_ms,
                    "Retention purge completed"
                );
                Ok(stats)
            }
            Err(e) => {
                self.metrics.record_failure();
                warn!(
                    namespace = store.namespace(),
                    cutoff_ms,
                    error = %e,
                    "Retention purge failed"
                );
                Err(e)
            }
        }
    }

    /// Purge according to `config`; an unlimited policy deletes nothing
    pub fn apply<S: KvStore>(
        &self,
        store: &RecordStore<S>,
        config: &RetentionConfig,
    ) -> Result<RetentionStats> {
        match config.cutoff_millis(now_millis()) {
            Some(cutoff_ms) => self.purge_before(store, cutoff_ms),
            None => Ok(RetentionStats::default()),
        }
    }
}

/// One-off [`RetentionSweeper::purge_older_than`] with natural-width bounds
pub fn purge_older_than<S: KvStore>(store: &RecordStore<S>, window: Duration) -> Result<usize> {
    RetentionSweeper::default().purge_older_than(store, window)
}

pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use keystamp_core::{encode_index, Element};
    use keystamp_storage::MemoryStore;

    fn seeded(timestamps: &[i64]) -> RecordStore<MemoryStore> {
        let store = RecordStore::in_memory("bucket").unwrap();
        let elements: Vec<Element> = timestamps
            .iter()
            .map(|ts| Element::new(encode_index(*ts, &["n", "x"]), b"v".to_vec()))
            .collect();
        store.set_all(&elements).unwrap();
        store
    }

    #[test]
    fn test_purge_older_than_window() {
        let now = now_millis();
        let store = seeded(&[now - 10_000, now - 5_000, now + 60_000]);

        let deleted = purge_older_than(&store, Duration::from_millis(1_000)).unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(store.keys().unwrap(), vec![encode_index(now + 60_000, &["n", "x"])]);

        // Idempotent once nothing is left in the window
        assert_eq!(purge_older_than(&store, Duration::from_millis(1_000)).unwrap(), 0);
    }

    #[test]
    fn test_purge_before_includes_cutoff() {
        let store = seeded(&[100, 200, 300]);
        let sweeper = RetentionSweeper::default();
        let stats = sweeper.purge_before(&store, 200).unwrap();
        assert_eq!(stats.records_deleted, 2);
        assert_eq!(stats.cutoff_ms, 200);
        assert_eq!(store.len().unwrap(), 1);

        let metrics = sweeper.metrics().to_map();
        assert_eq!(metrics["total_records_deleted"], 2);
        assert_eq!(metrics["cleanup_count"], 1);
        assert_eq!(metrics["cleanup_failures"], 0);
    }

    #[test]
    fn test_negative_cutoff_is_noop() {
        let store = seeded(&[100]);
        let stats = RetentionSweeper::default().purge_before(&store, -5).unwrap();
        assert_eq!(stats.records_deleted, 0);
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_unlimited_config_keeps_everything() {
        let store = seeded(&[1, 2, 3]);
        let stats = RetentionSweeper::default()
            .apply(&store, &RetentionConfig::unlimited())
            .unwrap();
        assert_eq!(stats, RetentionStats::default());
        assert_eq!(store.len().unwrap(), 3);

        let stats = RetentionSweeper::default()
            .apply(&store, &RetentionConfig::with_window(Duration::from_secs(60)))
            .unwrap();
        assert_eq!(stats.records_deleted, 3);
    }

    #[test]
    fn test_failure_is_counted() {
        let store = seeded(&[1]);
        store.backend().close();
        let sweeper = RetentionSweeper::default();
        assert!(sweeper.purge_before(&store, 10).is_err());
        assert_eq!(sweeper.metrics().to_map()["cleanup_failures"], 1);
    }
}
