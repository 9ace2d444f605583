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

//! Time-range scans over the record store
//!
//! Keys sort by their raw bytes. With a fixed-width timestamp rendering this
//! order is the timestamp order, so a scan is a single cursor walk:
//!
//! ```text
//!   ascending:   seek(first) ──next──▶ ... stop once ts > last
//!   descending:  seek(last + '<') ◀──prev── ... stop once ts <= first
//!                (or last() when nothing sorts after `last`)
//! ```
//!
//! Both bounds are compared against the timestamp segment of each key, so
//! every record stamped exactly `last` is included in either direction. The
//! lower bound is inclusive ascending and exclusive descending.

use crate::filter::{Filter, PatternCache, Predicate};
use keystamp_core::{timestamp_segment, Element, KeyCodec, KeystampError, Result};
use keystamp_core::ENTRY_TERMINATOR;
use keystamp_storage::{Cursor, KeyValue, KvStore, RecordStore};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Scan direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn is_descending(&self) -> bool {
        matches!(self, SortOrder::Descending)
    }
}

/// Numeric form: `1` ascending, `-1` descending
impl TryFrom<i32> for SortOrder {
    type Error = KeystampError;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            1 => Ok(SortOrder::Ascending),
            -1 => Ok(SortOrder::Descending),
            other => Err(KeystampError::Config(format!(
                "sort order must be 1 or -1, got {}",
                other
            ))),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Ascending => write!(f, "asc"),
            SortOrder::Descending => write!(f, "desc"),
        }
    }
}

/// Parameters of a range scan
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectQuery {
    pub first_ms: i64,
    pub last_ms: i64,
    pub order: SortOrder,
    /// Maximum number of accepted records, 0 for no limit
    pub limit: usize,
    pub filter: Filter,
}

impl SelectQuery {
    pub fn range(first_ms: i64, last_ms: i64) -> Self {
        Self {
            first_ms,
            last_ms,
            ..Default::default()
        }
    }

    pub fn descending(mut self) -> Self {
        self.order = SortOrder::Descending;
        self
    }

    pub fn with_order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }
}

/// Range scanner.
///
/// Holds the key codec used to render bounds and a cache of compiled
/// patterns shared by every scan it runs.
#[derive(Clone, Default)]
pub struct Scanner {
    codec: KeyCodec,
    patterns: PatternCache,
}

impl Scanner {
    pub fn new(codec: KeyCodec) -> Self {
        Self {
            codec,
            patterns: PatternCache::default(),
        }
    }

    pub fn with_pattern_cache(codec: KeyCodec, patterns: PatternCache) -> Self {
        Self { codec, patterns }
    }

    pub fn codec(&self) -> KeyCodec {
        self.codec
    }

    pub fn pattern_cache(&self) -> &PatternCache {
        &self.patterns
    }

    /// Records stamped within the query range, in key order.
    ///
    /// Invalid patterns and unrenderable bounds fail before the store is
    /// touched. Records rejected by the filter do not count toward the limit.
    pub fn select<S: KvStore>(
        &self,
        store: &RecordStore<S>,
        query: &SelectQuery,
    ) -> Result<Vec<Element>> {
        let lower = self.codec.bound_key(query.first_ms)?;
        let upper = self.codec.bound_key(query.last_ms)?;
        let predicate = Predicate::prepare(&query.filter, &self.patterns)?;
        let limit = if query.limit == 0 {
            usize::MAX
        } else {
            query.limit
        };

        let (elements, visited) = store.view(|txn| {
            let mut cursor = txn.cursor();
            let scan = RangeScan {
                lower: lower.as_bytes(),
                upper: upper.as_bytes(),
                predicate: &predicate,
                limit,
            };
            let result = match query.order {
                SortOrder::Ascending => scan.ascending(cursor.as_mut()),
                SortOrder::Descending => scan.descending(cursor.as_mut()),
            };
            cursor.status()?;
            Ok(result)
        })?;

        debug!(
            namespace = store.namespace(),
            order = %query.order,
            first = query.first_ms,
            last = query.last_ms,
            limit = query.limit,
            visited,
            matched = elements.len(),
            "Range scan complete"
        );
        Ok(elements)
    }
}

struct RangeScan<'q, 'f> {
    lower: &'q [u8],
    upper: &'q [u8],
    predicate: &'q Predicate<'f>,
    limit: usize,
}

impl RangeScan<'_, '_> {
    fn ascending(&self, cursor: &mut dyn Cursor) -> (Vec<Element>, usize) {
        let mut out = Vec::new();
        let mut visited = 0;
        let mut entry = cursor.seek(self.lower);
        while let Some(kv) = entry {
            if out.len() >= self.limit || timestamp_segment(kv.0) > self.upper {
                break;
            }
            visited += 1;
            self.accept(kv, &mut out);
            entry = cursor.next();
        }
        (out, visited)
    }

    fn descending(&self, cursor: &mut dyn Cursor) -> (Vec<Element>, usize) {
        let mut out = Vec::new();
        let mut visited = 0;

        // `<` is the byte after `;`, so this seeks past every key stamped `upper`
        let mut past_upper = self.upper.to_vec();
        past_upper.push(ENTRY_TERMINATOR + 1);
        let found = cursor.seek(&past_upper).is_some();
        let mut entry = if found { cursor.prev() } else { cursor.last() };

        while let Some(kv) = entry {
            if out.len() >= self.limit || timestamp_segment(kv.0) <= self.lower {
                break;
            }
            visited += 1;
            self.accept(kv, &mut out);
            entry = cursor.prev();
        }
        (out, visited)
    }

    fn accept(&self, (key, value): KeyValue<'_>, out: &mut Vec<Element>) {
        if self.predicate.matches(key) {
            out.push(Element::new(String::from_utf8_lossy(key), value));
        }
    }
}

/// One-off scan with natural-width bounds; `limit` of 0 means unbounded
pub fn select<S: KvStore>(
    store: &RecordStore<S>,
    first_ms: i64,
    last_ms: i64,
    order: SortOrder,
    limit: usize,
    filter: Filter,
) -> Result<Vec<Element>> {
    let query = SelectQuery {
        first_ms,
        last_ms,
        order,
        limit,
        filter,
    };
    Scanner::default().select(store, &query)
}
