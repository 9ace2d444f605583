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

//! Keystamp query layer
//!
//! Range scans, condition evaluation and retention on top of
//! `keystamp-storage`.
//!
//! ```text
//!   Keystamp ──▶ Scanner ──▶ RecordStore::view ──▶ Cursor
//!      │            │
//!      │            └── Filter ──▶ PatternCache (moka) / evaluator
//!      └──▶ RetentionSweeper ──▶ Scanner + RecordStore::set_all
//! ```

pub mod engine;
pub mod evaluator;
pub mod filter;
pub mod retention;
pub mod scanner;

pub use engine::Keystamp;
pub use evaluator::{evaluate, evaluate_node, evaluate_traced};
pub use filter::{Filter, PatternCache, DEFAULT_PATTERN_CACHE_CAPACITY};
pub use retention::{purge_older_than, RetentionMetrics, RetentionStats, RetentionSweeper};
pub use scanner::{select, Scanner, SelectQuery, SortOrder};
