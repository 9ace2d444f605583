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

//! Store handle recovery check
//!
//! Every record operation first confirms the handle is usable. A handle that
//! is being recovered (closed and reopened elsewhere) gets a bounded number of
//! checks with a fixed pause between them; only when every check fails is the
//! operation refused.

use crate::error::StoreError;
use crate::store::KvStore;
use keystamp_core::RecoveryConfig;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// Bounded retry with a fixed delay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RecoveryPolicy {
    fn default() -> Self {
        Self::from(&RecoveryConfig::default())
    }
}

impl From<&RecoveryConfig> for RecoveryPolicy {
    fn from(config: &RecoveryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            delay: config.delay(),
        }
    }
}

impl RecoveryPolicy {
    /// One check, no waiting
    pub fn immediate() -> Self {
        Self::from(&RecoveryConfig::immediate())
    }

    /// Wait until `store` is usable or the attempts run out
    pub fn ensure_available<S: KvStore>(&self, store: &S) -> Result<(), StoreError> {
        let attempts = self.max_attempts.max(1);
        for attempt in 1..=attempts {
            if store.is_open() {
                if attempt > 1 {
                    debug!(namespace = store.namespace(), attempt, "Store handle recovered");
                }
                return Ok(());
            }
            if attempt < attempts {
                debug!(
                    namespace = store.namespace(),
                    attempt,
                    delay_ms = self.delay.as_millis() as u64,
                    "Store handle not usable, waiting"
                );
                thread::sleep(self.delay);
            }
        }

        warn!(
            namespace = store.namespace(),
            attempts, "Store handle recovery failed"
        );
        Err(StoreError::Unavailable {
            namespace: store.namespace().to_string(),
            attempts,
        })
    }
}
