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

//! Condition trees
//!
//! Filters arrive as nested JSON objects ([`QueryRulesNode`]) where combinator
//! and leaf nodes share one shape:
//!
//! ```json
//! {
//!   "condition": "AND",
//!   "depth": 1,
//!   "rules": [
//!     { "depth": 2, "field": "category", "operator": "==", "value": "/DDOS" },
//!     { "depth": 2, "field": "direction", "operator": "!=", "value": "01" }
//!   ]
//! }
//! ```
//!
//! Before evaluation the wire form is converted into [`RuleNode`], which keeps
//! the two shapes apart. A node that sets both combinator and leaf fields is
//! resolved by [`MixedNodePolicy`]. Condition and operator names match
//! exactly (`AND`, `OR`, `==`, `!=`, `CONTAINS`); a node with an unknown name,
//! or with neither a condition nor a field, becomes [`RuleNode::Unsupported`]
//! and never matches.

use crate::error::{KeystampError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Wire form of a condition tree node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRulesNode {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub condition: String,
    /// Diagnostic indentation only; negative values indent like zero
    #[serde(default, skip_serializing_if = "is_zero")]
    pub depth: i32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<QueryRulesNode>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub field: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub value: Value,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub operator: String,
}

fn is_zero(depth: &i32) -> bool {
    *depth == 0
}

impl QueryRulesNode {
    fn has_combinator_fields(&self) -> bool {
        !self.condition.is_empty() || !self.rules.is_empty()
    }

    fn has_leaf_fields(&self) -> bool {
        !self.field.is_empty()
    }
}

/// Boolean combinator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    And,
    Or,
}

impl FromStr for Condition {
    type Err = KeystampError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "AND" => Ok(Condition::And),
            "OR" => Ok(Condition::Or),
            _ => Err(KeystampError::InvalidRule(format!(
                "unknown condition '{}'",
                s
            ))),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::And => f.write_str("AND"),
            Condition::Or => f.write_str("OR"),
        }
    }
}

/// Leaf comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equals,
    NotEquals,
    Contains,
}

impl FromStr for Operator {
    type Err = KeystampError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "==" => Ok(Operator::Equals),
            "!=" => Ok(Operator::NotEquals),
            "CONTAINS" => Ok(Operator::Contains),
            _ => Err(KeystampError::InvalidRule(format!(
                "unknown operator '{}'",
                s
            ))),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::Equals => f.write_str("=="),
            Operator::NotEquals => f.write_str("!="),
            Operator::Contains => f.write_str("CONTAINS"),
        }
    }
}

/// What to do with a node that sets both combinator and leaf fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MixedNodePolicy {
    /// Keep the leaf and drop the combinator part
    #[default]
    PreferLeaf,
    /// Refuse the tree
    Reject,
}

/// Validated condition tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleNode {
    Combinator {
        condition: Condition,
        rules: Vec<RuleNode>,
        depth: i32,
    },
    Leaf {
        field: String,
        operator: Operator,
        /// Comparison operand in its string form
        value: String,
        depth: i32,
    },
    /// Wire node with an unknown condition or operator, or with neither a
    /// condition nor a field; always evaluates to false
    Unsupported(Box<QueryRulesNode>),
}

impl RuleNode {
    pub fn and(rules: Vec<RuleNode>) -> Self {
        RuleNode::Combinator {
            condition: Condition::And,
            rules,
            depth: 0,
        }
    }

    pub fn or(rules: Vec<RuleNode>) -> Self {
        RuleNode::Combinator {
            condition: Condition::Or,
            rules,
            depth: 0,
        }
    }

    pub fn leaf(field: impl Into<String>, operator: Operator, value: impl Into<String>) -> Self {
        RuleNode::Leaf {
            field: field.into(),
            operator,
            value: value.into(),
            depth: 0,
        }
    }

    pub fn equals(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::leaf(field, Operator::Equals, value)
    }

    pub fn not_equals(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::leaf(field, Operator::NotEquals, value)
    }

    pub fn contains(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::leaf(field, Operator::Contains, value)
    }

    pub fn depth(&self) -> i32 {
        match self {
            RuleNode::Combinator { depth, .. } | RuleNode::Leaf { depth, .. } => *depth,
            RuleNode::Unsupported(node) => node.depth,
        }
    }

    /// Whether this node or any node below it can never match
    pub fn has_unsupported(&self) -> bool {
        match self {
            RuleNode::Combinator { rules, .. } => rules.iter().any(RuleNode::has_unsupported),
            RuleNode::Leaf { .. } => false,
            RuleNode::Unsupported(_) => true,
        }
    }

    /// Parse a JSON condition tree
    pub fn parse_json(text: &str, policy: MixedNodePolicy) -> Result<Self> {
        let node: QueryRulesNode = serde_json::from_str(text)?;
        Self::from_wire(&node, policy)
    }

    /// Convert an already deserialized JSON value
    pub fn from_json_value(value: Value, policy: MixedNodePolicy) -> Result<Self> {
        let node: QueryRulesNode = serde_json::from_value(value)?;
        Self::from_wire(&node, policy)
    }

    /// Validate a wire node and its children
    pub fn from_wire(node: &QueryRulesNode, policy: MixedNodePolicy) -> Result<Self> {
        let leaf = node.has_leaf_fields();
        let combinator = node.has_combinator_fields();

        if leaf && combinator {
            match policy {
                MixedNodePolicy::Reject => {
                    return Err(KeystampError::InvalidRule(format!(
                        "node for field '{}' also sets condition '{}' with {} rules",
                        node.field,
                        node.condition,
                        node.rules.len()
                    )));
                }
                MixedNodePolicy::PreferLeaf => {
                    warn!(
                        field = %node.field,
                        condition = %node.condition,
                        dropped_rules = node.rules.len(),
                        "Mixed condition node evaluated as a leaf"
                    );
                }
            }
        }

        if leaf {
            return Ok(match node.operator.parse() {
                Ok(operator) => RuleNode::Leaf {
                    field: node.field.clone(),
                    operator,
                    value: render_value(&node.value),
                    depth: node.depth,
                },
                Err(e) => unsupported(node, e),
            });
        }

        if combinator {
            let condition = match node.condition.parse() {
                Ok(condition) => condition,
                Err(e) => return Ok(unsupported(node, e)),
            };
            let rules = node
                .rules
                .iter()
                .map(|child| Self::from_wire(child, policy))
                .collect::<Result<Vec<_>>>()?;
            return Ok(RuleNode::Combinator {
                condition,
                rules,
                depth: node.depth,
            });
        }

        Ok(unsupported(
            node,
            KeystampError::InvalidRule("node sets neither a condition nor a field".to_string()),
        ))
    }
}

fn unsupported(node: &QueryRulesNode, reason: KeystampError) -> RuleNode {
    warn!(
        field = %node.field,
        condition = %node.condition,
        operator = %node.operator,
        reason = %reason,
        "Condition node never matches"
    );
    RuleNode::Unsupported(Box::new(node.clone()))
}

impl From<&RuleNode> for QueryRulesNode {
    fn from(node: &RuleNode) -> Self {
        match node {
            RuleNode::Combinator {
                condition,
                rules,
                depth,
            } => QueryRulesNode {
                condition: condition.to_string(),
                depth: *depth,
                rules: rules.iter().map(QueryRulesNode::from).collect(),
                ..Default::default()
            },
            RuleNode::Leaf {
                field,
                operator,
                value,
                depth,
            } => QueryRulesNode {
                depth: *depth,
                field: field.clone(),
                value: Value::String(value.clone()),
                operator: operator.to_string(),
                ..Default::default()
            },
            RuleNode::Unsupported(node) => (**node).clone(),
        }
    }
}

/// Default string form of a JSON operand: strings verbatim, null empty,
/// everything else as JSON text (`5`, `1.5`, `true`).
fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
