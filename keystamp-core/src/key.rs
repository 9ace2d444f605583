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

//! Composite key encoding
//!
//! Every record is stored under a single sortable key that packs the record
//! timestamp and an ordered list of field/value attributes:
//!
//! ```text
//! key        := timestamp ";" entry*
//! timestamp  := 1*DIGIT
//! entry      := "'" field "'" value ";"
//! field,value:= *(any byte except "'" and ";")
//! ```
//!
//! Range scans compare keys byte-lexicographically, which only coincides with
//! numeric timestamp order while every key in a store uses the same number of
//! timestamp digits. Millisecond epoch values have 13 digits until the year
//! 2286. [`TimestampWidth::Fixed`] makes that width explicit by zero padding
//! and rejecting timestamps that do not fit.

use crate::error::{KeystampError, Result};
use serde::{Deserialize, Serialize};

/// Terminates the timestamp segment and every entry
pub const ENTRY_TERMINATOR: u8 = b';';
/// Surrounds a field name
pub const FIELD_QUOTE: u8 = b'\'';
/// Digit count of millisecond epoch timestamps between 2001 and 2286
pub const MILLIS_TIMESTAMP_WIDTH: usize = 13;

/// Encode a timestamp and a flat `name, value, name, value, ...` list.
///
/// Pairs are consumed in order; a trailing unpaired name is dropped and pairs
/// with an empty value are omitted. Nothing is sorted or escaped, so names
/// and values must not contain `'` or `;`.
pub fn encode_index<S: AsRef<str>>(timestamp_ms: i64, fields: &[S]) -> String {
    let mut index = timestamp_ms.to_string();
    index.push(ENTRY_TERMINATOR as char);
    push_entries(&mut index, fields);
    index
}

/// Bare timestamp form used as a range-scan boundary
pub fn bound_key(timestamp_ms: i64) -> String {
    timestamp_ms.to_string()
}

fn push_entries<S: AsRef<str>>(index: &mut String, fields: &[S]) {
    for pair in fields.chunks_exact(2) {
        let (name, value) = (pair[0].as_ref(), pair[1].as_ref());
        if value.is_empty() {
            continue;
        }
        index.push(FIELD_QUOTE as char);
        index.push_str(name);
        index.push(FIELD_QUOTE as char);
        index.push_str(value);
        index.push(ENTRY_TERMINATOR as char);
    }
}

/// Timestamp bytes of a key (everything before the first `;`)
pub fn timestamp_segment(key: &[u8]) -> &[u8] {
    match key.iter().position(|b| *b == ENTRY_TERMINATOR) {
        Some(end) => &key[..end],
        None => key,
    }
}

/// Value span of `field` inside an encoded key: the bytes after `;'field'`
/// up to the next `;'`, which starts the following entry.
///
/// Returns `None` when the field has no entry in the key, or when no entry
/// follows it (the last field of a key has no closing `;'`).
pub fn field_value<'a>(key: &'a [u8], field: &str) -> Option<&'a [u8]> {
    let mut needle = Vec::with_capacity(field.len() + 3);
    needle.push(ENTRY_TERMINATOR);
    needle.push(FIELD_QUOTE);
    needle.extend_from_slice(field.as_bytes());
    needle.push(FIELD_QUOTE);

    let start = find_subslice(key, &needle)? + needle.len();
    let rest = &key[start..];
    let end = find_subslice(rest, &[ENTRY_TERMINATOR, FIELD_QUOTE])?;
    Some(&rest[..end])
}

/// Position of the first occurrence of `needle` in `haystack`
pub fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// A key split back into its timestamp and entries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedIndex<'a> {
    pub timestamp_ms: i64,
    pub fields: Vec<(&'a str, &'a str)>,
}

impl DecodedIndex<'_> {
    /// Value stored for `field`, if any
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, value)| *value)
    }
}

/// Decode a key into its components
pub fn decode_index(key: &str) -> Option<DecodedIndex<'_>> {
    let (timestamp, mut rest) = key.split_once(ENTRY_TERMINATOR as char)?;
    let timestamp_ms = timestamp.parse().ok()?;

    let mut fields = Vec::new();
    while !rest.is_empty() {
        let entry = rest.strip_prefix(FIELD_QUOTE as char)?;
        let (name, after_name) = entry.split_once(FIELD_QUOTE as char)?;
        let (value, after_value) = after_name.split_once(ENTRY_TERMINATOR as char)?;
        fields.push((name, value));
        rest = after_value;
    }

    Some(DecodedIndex {
        timestamp_ms,
        fields,
    })
}

/// How timestamps are rendered into keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampWidth {
    /// Plain decimal, byte-compatible with existing stores
    #[default]
    Natural,
    /// Zero padded to exactly this many digits; negative or wider values are rejected
    Fixed(usize),
}

/// Validating key encoder.
///
/// Produces the same bytes as [`encode_index`] for valid input but refuses
/// input that would break the grammar or the ordering invariant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyCodec {
    width: TimestampWidth,
}

impl KeyCodec {
    pub fn new(width: TimestampWidth) -> Self {
        Self { width }
    }

    /// Codec for 13-digit millisecond timestamps
    pub fn millis() -> Self {
        Self::new(TimestampWidth::Fixed(MILLIS_TIMESTAMP_WIDTH))
    }

    pub fn width(&self) -> TimestampWidth {
        self.width
    }

    /// Encode a record key, see [`encode_index`]
    pub fn encode<S: AsRef<str>>(&self, timestamp_ms: i64, fields: &[S]) -> Result<String> {
        for pair in fields.chunks_exact(2) {
            let (name, value) = (pair[0].as_ref(), pair[1].as_ref());
            if value.is_empty() {
                continue;
            }
            if name.is_empty() {
                return Err(KeystampError::InvalidKey(format!(
                    "empty field name for value '{}'",
                    value
                )));
            }
            check_delimiters("field", name)?;
            check_delimiters("value", value)?;
        }

        let mut index = self.render_timestamp(timestamp_ms)?;
        index.push(ENTRY_TERMINATOR as char);
        push_entries(&mut index, fields);
        Ok(index)
    }

    /// Range boundary for `timestamp_ms`, rendered with the codec's width
    pub fn bound_key(&self, timestamp_ms: i64) -> Result<String> {
        self.render_timestamp(timestamp_ms)
    }

    fn render_timestamp(&self, timestamp_ms: i64) -> Result<String> {
        match self.width {
            TimestampWidth::Natural => Ok(timestamp_ms.to_string()),
            TimestampWidth::Fixed(width) => {
                let rendered = format!("{:0width$}", timestamp_ms, width = width);
                if timestamp_ms < 0 || rendered.len() > width {
                    return Err(KeystampError::InvalidKey(format!(
                        "timestamp {} does not fit in {} digits",
                        timestamp_ms, width
                    )));
                }
                Ok(rendered)
            }
        }
    }
}

fn check_delimiters(what: &str, text: &str) -> Result<()> {
    if text
        .bytes()
        .any(|b| b == FIELD_QUOTE || b == ENTRY_TERMINATOR)
    {
        return Err(KeystampError::InvalidKey(format!(
            "{} '{}' contains a reserved delimiter",
            what, text
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_preserves_pair_order() {
        let key = encode_index(1700000000000, &["zone", "b", "app", "a"]);
        assert_eq!(key, "1700000000000;'zone'b;'app'a;");
    }

    #[test]
    fn test_encode_drops_trailing_name() {
        assert_eq!(encode_index(42, &["solo"]), "42;");
        assert_eq!(encode_index(42, &["k", "v", "dangling"]), "42;'k'v;");
    }

    #[test]
    fn test_encode_skips_empty_values() {
        let key = encode_index(7, &["a", "", "b", "2"]);
        assert_eq!(key, "7;'b'2;");
        assert_eq!(encode_index::<&str>(7, &[]), "7;");
    }

    #[test]
    fn test_bound_key_is_bare_timestamp() {
        assert_eq!(bound_key(1700000000000), "1700000000000");
        assert!(bound_key(20).as_bytes() < encode_index(20, &["a", "b"]).as_bytes());
    }

    #[test]
    fn test_timestamp_segment() {
        assert_eq!(timestamp_segment(b"123;'a'b;"), b"123");
        assert_eq!(timestamp_segment(b"123"), b"123");
        assert_eq!(timestamp_segment(b""), b"");
    }

    #[test]
    fn test_field_value_extraction() {
        let key = b"1;'direction'02;'attacker'ab76test8a;'category'/DDOS;";
        assert_eq!(field_value(key, "attacker"), Some(&b"ab76test8a"[..]));
        assert_eq!(field_value(key, "direction"), Some(&b"02"[..]));
        // Nothing follows the last entry
        assert_eq!(field_value(key, "category"), None);
        assert_eq!(field_value(b"1;'only'value;", "only"), None);
        assert_eq!(field_value(key, "missing"), None);
        // "tack" must not match inside "attacker"
        assert_eq!(field_value(key, "tack"), None);
    }

    #[test]
    fn test_decode_index() {
        let key = encode_index(1000, &["host", "web-1", "level", "warn"]);
        let decoded = decode_index(&key).unwrap();
        assert_eq!(decoded.timestamp_ms, 1000);
        assert_eq!(decoded.fields, vec![("host", "web-1"), ("level", "warn")]);
        assert_eq!(decoded.get("level"), Some("warn"));

        assert!(decode_index("not-a-key").is_none());
        assert!(decode_index("10;garbage").is_none());
    }

    #[test]
    fn test_codec_natural_matches_free_function() {
        let codec = KeyCodec::default();
        let fields = ["direction", "02", "category", "/DDOS"];
        assert_eq!(codec.encode(99, &fields).unwrap(), encode_index(99, &fields));
        assert_eq!(codec.bound_key(99).unwrap(), bound_key(99));
    }

    #[test]
    fn test_codec_fixed_width_pads_and_rejects() {
        let codec = KeyCodec::new(TimestampWidth::Fixed(5));
        assert_eq!(codec.encode(42, &["a", "b"]).unwrap(), "00042;'a'b;");
        assert_eq!(codec.bound_key(0).unwrap(), "00000");
        assert!(codec.encode(123456, &["a", "b"]).is_err());
        assert!(codec.bound_key(-1).is_err());

        let millis = KeyCodec::millis();
        assert_eq!(millis.bound_key(1700000000000).unwrap(), "1700000000000");
        assert_eq!(millis.bound_key(999).unwrap(), "0000000000999");
    }

    #[test]
    fn test_codec_rejects_delimiters() {
        let codec = KeyCodec::default();
        assert!(codec.encode(1, &["na;me", "v"]).is_err());
        assert!(codec.encode(1, &["name", "it's"]).is_err());
        assert!(codec.encode(1, &["", "v"]).is_err());
        // Omitted pairs are not validated
        assert_eq!(codec.encode(1, &["na;me", ""]).unwrap(), "1;");
    }
}
