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

//! Storage error types

use keystamp_core::KeystampError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors reported by a store backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store handle for namespace '{0}' is closed")]
    Closed(String),

    #[error("Store handle for namespace '{namespace}' not usable after {attempts} checks")]
    Unavailable { namespace: String, attempts: u32 },

    #[error("Namespace not found: {0}")]
    NamespaceNotFound(String),

    #[error("Corrupt store at {}: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },

    #[error("Failed to open store at {}: {source}", path.display())]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rocksdb::Error,
    },

    #[error("RocksDB error: {0}")]
    Backend(#[from] rocksdb::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StoreError> for KeystampError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Closed(_) | StoreError::Unavailable { .. } => {
                KeystampError::StoreUnavailable(e.to_string())
            }
            StoreError::Io(io) => KeystampError::Io(io),
            other => KeystampError::Store(other.to_string()),
        }
    }
}
