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

//! Configuration for keystamp
//!
//! All settings live in one TOML document:
//!
//! ```toml
//! [store]
//! namespace = "events"
//! path = "./data/events"
//! sync_writes = false
//!
//! [recovery]
//! max_attempts = 3
//! delay_ms = 1000
//!
//! [retention]
//! window_secs = 604800
//! enabled = true
//!
//! [key]
//! timestamp_width = { fixed = 13 }
//! mixed_nodes = "prefer_leaf"
//! ```
//!
//! A missing file or section falls back to the defaults below.

use crate::error::{KeystampError, Result};
use crate::key::{KeyCodec, TimestampWidth};
use crate::rules::MixedNodePolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Namespace used when none is configured
pub const DEFAULT_NAMESPACE: &str = "bucket";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeystampConfig {
    pub store: StoreConfig,
    pub recovery: RecoveryConfig,
    pub retention: RetentionConfig,
    pub key: KeyConfig,
}

impl KeystampConfig {
    /// Load from a TOML file; a missing file yields defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save as TOML
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        info!(path = %path.display(), "Config saved");
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.store.namespace.is_empty() {
            return Err(KeystampError::Config("store.namespace is empty".to_string()));
        }
        if self.recovery.max_attempts == 0 {
            return Err(KeystampError::Config(
                "recovery.max_attempts must be at least 1".to_string(),
            ));
        }
        if let TimestampWidth::Fixed(0) = self.key.timestamp_width {
            return Err(KeystampError::Config(
                "key.timestamp_width fixed width must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Store construction settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Namespace (bucket) all records of this handle live in
    pub namespace: String,
    /// RocksDB data directory; `None` keeps the store in memory only
    pub path: Option<PathBuf>,
    /// Fsync the write-ahead log on every commit
    pub sync_writes: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            path: None,
            sync_writes: false,
        }
    }
}

impl StoreConfig {
    /// In-memory store for the given namespace
    pub fn in_memory(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Default::default()
        }
    }

    /// RocksDB store in directory `path`, default namespace
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Default::default()
        }
    }
}

/// Handle recovery check settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    /// Checks performed before giving up
    pub max_attempts: u32,
    /// Fixed pause between checks
    pub delay_ms: u64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_ms: 1000,
        }
    }
}

impl RecoveryConfig {
    /// Single check, no waiting
    pub fn immediate() -> Self {
        Self {
            max_attempts: 1,
            delay_ms: 0,
        }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Rolling retention settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Records older than this many seconds are purged (None or 0 = keep forever)
    pub window_secs: Option<u64>,
    pub enabled: bool,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            window_secs: Some(7 * 24 * 60 * 60),
            enabled: true,
        }
    }
}

impl RetentionConfig {
    pub fn unlimited() -> Self {
        Self {
            window_secs: None,
            enabled: false,
        }
    }

    pub fn with_window(window: Duration) -> Self {
        Self {
            window_secs: Some(window.as_secs()),
            enabled: true,
        }
    }

    pub fn is_unlimited(&self) -> bool {
        !self.enabled || matches!(self.window_secs, None | Some(0))
    }

    /// Retention window, `None` when unlimited
    pub fn window(&self) -> Option<Duration> {
        if self.is_unlimited() {
            return None;
        }
        self.window_secs.map(Duration::from_secs)
    }

    /// Cutoff in epoch milliseconds for `now_ms`, `None` when unlimited
    pub fn cutoff_millis(&self, now_ms: i64) -> Option<i64> {
        let window = self.window()?;
        let window_ms = i64::try_from(window.as_millis()).unwrap_or(i64::MAX);
        Some(now_ms.saturating_sub(window_ms))
    }
}

/// Key encoding and rule parsing settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyConfig {
    pub timestamp_width: TimestampWidth,
    pub mixed_nodes: MixedNodePolicy,
}

impl KeyConfig {
    pub fn codec(&self) -> KeyCodec {
        KeyCodec::new(self.timestamp_width)
    }
}
