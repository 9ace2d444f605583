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

//! Property tests for key encoding, evaluation and range scans

use keystamp_core::{Element, KeyCodec, RuleNode};
use keystamp_query::{evaluate_node, Filter, Scanner, SelectQuery};
use keystamp_storage::{MemoryStore, RecordStore};
use proptest::prelude::*;
use std::collections::BTreeSet;

fn field_pairs() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::vec(("[a-z]{1,8}", "[A-Za-z0-9/._-]{1,12}"), 1..6)
}

fn flatten(pairs: &[(String, String)]) -> Vec<String> {
    pairs
        .iter()
        .flat_map(|(name, value)| [name.clone(), value.clone()])
        .collect()
}

fn seeded(codec: KeyCodec, timestamps: &BTreeSet<i64>) -> RecordStore<MemoryStore> {
    let store = RecordStore::in_memory("bucket").unwrap();
    let elements: Vec<Element> = timestamps
        .iter()
        .map(|ts| Element::new(codec.encode(*ts, &["n", "x"]).unwrap(), b"v".to_vec()))
        .collect();
    store.set_all(&elements).unwrap();
    store
}

fn timestamps_of(elements: &[Element]) -> Vec<i64> {
    elements
        .iter()
        .map(|e| {
            let digits = e.index.split(';').next().unwrap();
            digits.parse().unwrap()
        })
        .collect()
}

proptest! {
    #[test]
    fn encoded_pairs_satisfy_equals(ts in 0i64..10_000_000_000_000, pairs in field_pairs()) {
        let key = KeyCodec::millis().encode(ts, &flatten(&pairs)).unwrap();
        for (name, value) in &pairs {
            prop_assert!(evaluate_node(key.as_bytes(), &RuleNode::equals(name.as_str(), value.as_str())));
            prop_assert!(!evaluate_node(key.as_bytes(), &RuleNode::not_equals(name.as_str(), value.as_str())));
        }
    }

    #[test]
    fn ascending_scan_matches_inclusive_range(
        timestamps in prop::collection::btree_set(0i64..1_000, 0..40),
        a in 0i64..1_000,
        b in 0i64..1_000,
    ) {
        let (first, last) = (a.min(b), a.max(b));
        let codec = KeyCodec::millis();
        let store = seeded(codec, &timestamps);

        let result = Scanner::new(codec).select(&store, &SelectQuery::range(first, last)).unwrap();
        let expected: Vec<i64> = timestamps.range(first..=last).copied().collect();
        prop_assert_eq!(timestamps_of(&result), expected);
    }

    #[test]
    fn descending_scan_excludes_lower_bound(
        timestamps in prop::collection::btree_set(0i64..1_000, 0..40),
        a in 0i64..1_000,
        b in 0i64..1_000,
    ) {
        let (first, last) = (a.min(b), a.max(b));
        let codec = KeyCodec::millis();
        let store = seeded(codec, &timestamps);

        let result = Scanner::new(codec)
            .select(&store, &SelectQuery::range(first, last).descending())
            .unwrap();
        let expected: Vec<i64> = timestamps
            .iter()
            .rev()
            .filter(|ts| **ts > first && **ts <= last)
            .copied()
            .collect();
        prop_assert_eq!(timestamps_of(&result), expected);
    }

    #[test]
    fn limit_bounds_result_length(
        timestamps in prop::collection::btree_set(0i64..500, 0..40),
        limit in 1usize..10,
        descending in any::<bool>(),
    ) {
        let codec = KeyCodec::millis();
        let store = seeded(codec, &timestamps);
        let mut query = SelectQuery::range(0, 500).with_limit(limit);
        if descending {
            query = query.descending();
        }
        let result = Scanner::new(codec).select(&store, &query).unwrap();
        prop_assert!(result.len() <= limit);
    }
}

#[test]
fn test_worked_example() {
    let key = KeyCodec::millis()
        .encode(
            1_700_000_000_000,
            &["direction", "02", "attacker", "ab76test8a", "category", "/DDOS"],
        )
        .unwrap();
    let store = RecordStore::in_memory("bucket").unwrap();
    store
        .set_all(&[Element::new(key.clone(), b"event".to_vec())])
        .unwrap();

    let rules = RuleNode::and(vec![
        RuleNode::or(vec![
            RuleNode::equals("category", "/DDOS"),
            RuleNode::contains("attacker", "test"),
        ]),
        RuleNode::not_equals("direction", "01"),
    ]);
    let query = SelectQuery::range(1_699_999_999_999, 1_700_000_000_000)
        .with_filter(Filter::rules(rules));
    let result = Scanner::new(KeyCodec::millis()).select(&store, &query).unwrap();
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].index, key);
}
