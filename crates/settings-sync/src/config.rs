//! Synchronization configuration.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};

/// What to do when persisting a local change fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum SaveFailurePolicy {
    /// Keep the local change, log it, and move on (at-most-once).
    #[default]
    Drop,

    /// Retry with exponential backoff before giving up.
    Retry {
        /// Total attempts including the first one.
        max_attempts: u32,
        /// Delay before the second attempt; doubles after each failure.
        backoff_ms: u64,
    },
}

impl SaveFailurePolicy {
    /// Total number of `set` attempts per change.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Drop => 1,
            Self::Retry { max_attempts, .. } => (*max_attempts).max(1),
        }
    }

    /// Delay after failed attempt number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        match self {
            Self::Drop => Duration::ZERO,
            Self::Retry { backoff_ms, .. } => {
                let factor = 1u64 << attempt.saturating_sub(1).min(16);
                Duration::from_millis(backoff_ms.saturating_mul(factor))
            }
        }
    }
}

/// Configuration shared by every cell of one window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Quiet period before a burst of remote notifications triggers a reload.
    ///
    /// Every further notification for the same key restarts the timer.
    pub debounce_ms: u64,

    /// Behaviour when the store rejects a write.
    pub save_failure: SaveFailurePolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 100,
            save_failure: SaveFailurePolicy::Drop,
        }
    }
}

impl SyncConfig {
    /// Debounce window as a `Duration`.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    #[must_use]
    pub fn with_debounce_ms(mut self, debounce_ms: u64) -> Self {
        self.debounce_ms = debounce_ms;
        self
    }

    #[must_use]
    pub fn with_save_failure(mut self, policy: SaveFailurePolicy) -> Self {
        self.save_failure = policy;
        self
    }

    /// Parse a TOML document. Missing fields take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| SyncError::ConfigParse { source: e })
    }

    /// Load from a TOML file. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(SyncError::ConfigIo {
                path: path.to_path_buf(),
                source: e,
            }),
        }
    }
}
