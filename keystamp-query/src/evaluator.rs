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

//! Condition tree evaluation against encoded keys
//!
//! Evaluation is a pure function of the key bytes and the tree. Leaves look
//! attributes up directly in the key grammar:
//!
//! - `==` / `!=`: the key does / does not contain the entry `'field'value;`
//! - `CONTAINS`: the span after `'field'` up to the next `;'` contains the
//!   operand; the last entry of a key has no such span
//!
//! Combinators short-circuit left to right. A combinator without children is
//! false for both AND and OR, and an unsupported node is always false.

use keystamp_core::{field_value, find_subslice, Condition, Operator, RuleNode};
use keystamp_core::{ENTRY_TERMINATOR, FIELD_QUOTE};
use tracing::debug;

/// Evaluate an optional tree; a missing tree never matches
pub fn evaluate(key: &[u8], node: Option<&RuleNode>) -> bool {
    node.map_or(false, |node| eval(key, node, false))
}

/// Evaluate a tree
pub fn evaluate_node(key: &[u8], node: &RuleNode) -> bool {
    eval(key, node, false)
}

/// Evaluate a tree and log every node at debug level, indented by its depth:
///
/// ```text
/// ——| AND
/// ————| OR
/// ——————| category == "/DDOS" : true
/// ```
pub fn evaluate_traced(key: &[u8], node: &RuleNode) -> bool {
    eval(key, node, true)
}

fn eval(key: &[u8], node: &RuleNode, trace: bool) -> bool {
    match node {
        RuleNode::Combinator {
            condition,
            rules,
            depth,
        } => {
            if trace {
                debug!("{}| {}", indent(*depth), condition);
            }
            match condition {
                Condition::And => {
                    !rules.is_empty() && rules.iter().all(|child| eval(key, child, trace))
                }
                Condition::Or => rules.iter().any(|child| eval(key, child, trace)),
            }
        }
        RuleNode::Leaf {
            field,
            operator,
            value,
            depth,
        } => {
            let state = compare(key, field, *operator, value);
            if trace {
                debug!(
                    "{}| {} {} {:?} : {}",
                    indent(*depth),
                    field,
                    operator,
                    value,
                    state
                );
            }
            state
        }
        RuleNode::Unsupported(wire) => {
            if trace {
                debug!(
                    "{}| unsupported {}{} : false",
                    indent(wire.depth),
                    wire.condition,
                    wire.operator
                );
            }
            false
        }
    }
}

fn compare(key: &[u8], field: &str, operator: Operator, value: &str) -> bool {
    match operator {
        Operator::Equals => has_entry(key, field, value),
        Operator::NotEquals => !has_entry(key, field, value),
        Operator::Contains => match field_value(key, field) {
            Some(stored) if !stored.is_empty() => {
                find_subslice(stored, value.as_bytes()).is_some()
            }
            _ => false,
        },
    }
}

/// Whether the key holds exactly `'field'value;`
fn has_entry(key: &[u8], field: &str, value: &str) -> bool {
    let mut entry = Vec::with_capacity(field.len() + value.len() + 4);
    entry.push(ENTRY_TERMINATOR);
    entry.push(FIELD_QUOTE);
    entry.extend_from_slice(field.as_bytes());
    entry.push(FIELD_QUOTE);
    entry.extend_from_slice(value.as_bytes());
    entry.push(ENTRY_TERMINATOR);
    find_subslice(key, &entry).is_some()
}

fn indent(depth: i32) -> String {
    "——".repeat(usize::try_from(depth).unwrap_or(0))
}
