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

//! Scan filters
//!
//! A scan is filtered either by a list of regular expressions matched
//! against the raw key bytes (all must match) or by a condition tree.

use crate::evaluator::evaluate_node;
use keystamp_core::{KeystampError, MixedNodePolicy, Result, RuleNode};
use moka::sync::Cache;
use regex::bytes::Regex;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Default number of compiled patterns kept by a [`PatternCache`]
pub const DEFAULT_PATTERN_CACHE_CAPACITY: u64 = 256;

/// Key filter applied during a scan
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Filter {
    /// Accept every key
    #[default]
    None,
    /// Every pattern must match the key
    Patterns(Vec<String>),
    /// The condition tree must evaluate to true
    Rules(RuleNode),
}

impl Filter {
    pub fn patterns<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Filter::Patterns(patterns.into_iter().map(Into::into).collect())
    }

    pub fn rules(node: RuleNode) -> Self {
        Filter::Rules(node)
    }

    /// Build a filter from its JSON form.
    ///
    /// `null` and `[]` mean no filter, a string or an array of strings is a
    /// pattern list and an object is a condition tree. Anything else is
    /// rejected with [`KeystampError::UnsupportedFilter`].
    pub fn from_json(value: Value, policy: MixedNodePolicy) -> Result<Self> {
        match value {
            Value::Null => Ok(Filter::None),
            Value::String(pattern) => Ok(Filter::Patterns(vec![pattern])),
            Value::Array(items) => {
                let mut patterns = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::String(pattern) => patterns.push(pattern),
                        Value::Null => {}
                        other => {
                            return Err(KeystampError::UnsupportedFilter(format!(
                                "pattern list holds a {}",
                                json_kind(&other)
                            )))
                        }
                    }
                }
                if patterns.is_empty() {
                    Ok(Filter::None)
                } else {
                    Ok(Filter::Patterns(patterns))
                }
            }
            Value::Object(_) => Ok(Filter::Rules(RuleNode::from_json_value(value, policy)?)),
            other => Err(KeystampError::UnsupportedFilter(json_kind(&other).to_string())),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Filter::None)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Compiled patterns, keyed by their source text
#[derive(Clone)]
pub struct PatternCache {
    compiled: Cache<String, Arc<Regex>>,
}

impl Default for PatternCache {
    fn default() -> Self {
        Self::new(DEFAULT_PATTERN_CACHE_CAPACITY)
    }
}

impl PatternCache {
    pub fn new(capacity: u64) -> Self {
        Self {
            compiled: Cache::builder().max_capacity(capacity).build(),
        }
    }

    /// Compiled form of `pattern`, compiling it on first use
    pub fn compile(&self, pattern: &str) -> Result<Arc<Regex>> {
        if let Some(regex) = self.compiled.get(pattern) {
            return Ok(regex);
        }
        let regex = Regex::new(pattern).map_err(|e| KeystampError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        let regex = Arc::new(regex);
        debug!(pattern, "Compiled key pattern");
        self.compiled.insert(pattern.to_string(), Arc::clone(&regex));
        Ok(regex)
    }

    pub fn entry_count(&self) -> u64 {
        self.compiled.run_pending_tasks();
        self.compiled.entry_count()
    }
}

/// Filter prepared for a scan: patterns compiled, tree borrowed
pub(crate) enum Predicate<'f> {
    All,
    Patterns(Vec<Arc<Regex>>),
    Rules(&'f RuleNode),
}

impl<'f> Predicate<'f> {
    /// Compile `filter`; invalid patterns fail before any key is read
    pub(crate) fn prepare(filter: &'f Filter, cache: &PatternCache) -> Result<Self> {
        match filter {
            Filter::None => Ok(Predicate::All),
            Filter::Patterns(patterns) if patterns.is_empty() => Ok(Predicate::All),
            Filter::Patterns(patterns) => patterns
                .iter()
                .map(|pattern| cache.compile(pattern))
                .collect::<Result<Vec<_>>>()
                .map(Predicate::Patterns),
            Filter::Rules(node) => Ok(Predicate::Rules(node)),
        }
    }

    pub(crate) fn matches(&self, key: &[u8]) -> bool {
        match self {
            Predicate::All => true,
            Predicate::Patterns(patterns) => patterns.iter().all(|regex| regex.is_match(key)),
            Predicate::Rules(node) => evaluate_node(key, node),
        }
    }
}
