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

//! Ordering properties of encoded keys

use keystamp_core::{decode_index, timestamp_segment, KeyCodec, TimestampWidth};
use proptest::prelude::*;

proptest! {
    #[test]
    fn fixed_width_keys_sort_by_timestamp(
        a in 0i64..10_000_000_000_000,
        b in 0i64..10_000_000_000_000,
        value_a in "[a-z0-9]{1,6}",
        value_b in "[a-z0-9]{1,6}",
    ) {
        prop_assume!(a != b);
        let codec = KeyCodec::millis();
        let key_a = codec.encode(a, &["f", value_a.as_str()]).unwrap();
        let key_b = codec.encode(b, &["f", value_b.as_str()]).unwrap();
        prop_assert_eq!(a < b, key_a < key_b);
        prop_assert_eq!(
            a < b,
            timestamp_segment(key_a.as_bytes()) < timestamp_segment(key_b.as_bytes())
        );
    }

    #[test]
    fn decoded_key_keeps_timestamp_and_order(
        ts in 0i64..10_000_000_000_000,
        names in prop::collection::vec("[a-z]{1,6}", 1..5),
    ) {
        let mut flat = Vec::new();
        for (i, name) in names.iter().enumerate() {
            flat.push(name.clone());
            flat.push(format!("v{}", i));
        }
        let key = KeyCodec::new(TimestampWidth::Fixed(13)).encode(ts, &flat).unwrap();
        let decoded = decode_index(&key).unwrap();
        prop_assert_eq!(decoded.timestamp_ms, ts);
        let decoded_names: Vec<&str> = decoded.fields.iter().map(|(name, _)| *name).collect();
        let expected: Vec<&str> = names.iter().map(String::as_str).collect();
        prop_assert_eq!(decoded_names, expected);
    }
}

#[test]
fn natural_width_breaks_ordering() {
    let codec = KeyCodec::default();
    let small = codec.encode(9, &["f", "x"]).unwrap();
    let large = codec.encode(10, &["f", "x"]).unwrap();
    assert!(small > large);
}
