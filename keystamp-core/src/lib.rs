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

//! Keystamp Core
//!
//! Fundamental types shared by the storage and query layers: the composite
//! key grammar, records, condition trees, configuration and errors.

pub mod config;
pub mod element;
pub mod error;
pub mod key;
pub mod rules;

pub use config::{
    KeyConfig, KeystampConfig, RecoveryConfig, RetentionConfig, StoreConfig, DEFAULT_NAMESPACE,
};
pub use element::{elements_from_map, Element};
pub use error::{KeystampError, Result};
pub use key::{
    bound_key, decode_index, encode_index, field_value, find_subslice, timestamp_segment,
    DecodedIndex, KeyCodec, TimestampWidth, ENTRY_TERMINATOR, FIELD_QUOTE, MILLIS_TIMESTAMP_WIDTH,
};
pub use rules::{Condition, MixedNodePolicy, Operator, QueryRulesNode, RuleNode};
