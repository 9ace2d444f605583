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

//! Error types for keystamp operations

use thiserror::Error;

/// Result type for keystamp operations
pub type Result<T> = std::result::Result<T, KeystampError>;

/// Errors surfaced by the keystamp layers.
///
/// Configuration errors (`InvalidPattern`, `UnsupportedFilter`, `InvalidRule`,
/// `InvalidKey`, `Config`) are fatal and never retried. `StoreUnavailable` and
/// `Store` carry failures reported by the underlying transactional store.
#[derive(Debug, Error)]
pub enum KeystampError {
    /// Key could not be encoded under the configured grammar
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Condition tree is malformed
    #[error("Invalid rule: {0}")]
    InvalidRule(String),

    /// Regex prefilter failed to compile
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Filter argument is neither a pattern list nor a condition tree
    #[error("Unsupported filter type '{0}'")]
    UnsupportedFilter(String),

    /// Store handle could not be used (closed or never recovered)
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Failure reported while running a transaction
    #[error("Store error: {0}")]
    Store(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for KeystampError {
    fn from(e: serde_json::Error) -> Self {
        KeystampError::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for KeystampError {
    fn from(e: toml::de::Error) -> Self {
        KeystampError::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for KeystampError {
    fn from(e: toml::ser::Error) -> Self {
        KeystampError::Config(e.to_string())
    }
}

impl KeystampError {
    /// Whether the error is a configuration error that must not be retried
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            KeystampError::InvalidKey(_)
                | KeystampError::InvalidRule(_)
                | KeystampError::InvalidPattern { .. }
                | KeystampError::UnsupportedFilter(_)
                | KeystampError::Config(_)
        )
    }
}
