//! Synchronization error types.
//!
//! Errors never escape a window's background tasks; they end up in a
//! `tracing` event. The typed forms exist so each failure is logged with
//! its cause chain and can be matched in tests.

use std::path::PathBuf;

use settings_channel::ChannelError;
use settings_store::StoreError;
use thiserror::Error;

use crate::hooks::CodecError;

/// Synchronization error.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Backing store failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Change channel failure.
    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// The cell's codec rejected a value.
    #[error("Failed to {stage} value for key \"{key}\"")]
    Codec {
        key: String,
        stage: &'static str,
        #[source]
        source: CodecError,
    },

    /// A stored value does not have the shape the cell expects.
    #[error("Stored value for key \"{key}\" has an unexpected shape")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// A value could not be converted for storage.
    #[error("Value for key \"{key}\" could not be serialized")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Config file could not be read.
    #[error("Failed to read sync config: {path}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for [`SyncConfig`](crate::SyncConfig).
    #[error("Invalid sync config")]
    ConfigParse {
        #[source]
        source: toml::de::Error,
    },
}

impl SyncError {
    /// Get a user-friendly message for this error.
    pub fn user_message(&self) -> String {
        match self {
            Self::Store(e) => e.user_message(),
            Self::Channel(e) => e.user_message(),
            Self::Codec { key, .. } | Self::Decode { key, .. } => {
                format!("The saved value of \"{key}\" could not be read; the default is used.")
            }
            Self::Encode { key, .. } => format!("The value of \"{key}\" could not be saved."),
            Self::ConfigIo { path, .. } => {
                format!("Could not read the sync configuration at {}", path.display())
            }
            Self::ConfigParse { .. } => "The sync configuration is not valid.".to_string(),
        }
    }

    /// Get a suggestion for how to resolve this error.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::Store(e) => e.suggestion(),
            Self::Channel(e) => e.suggestion(),
            Self::Codec { .. } | Self::Decode { .. } => {
                Some("Set the value again to overwrite the unreadable copy.".into())
            }
            Self::Encode { .. } => None,
            Self::ConfigIo { .. } | Self::ConfigParse { .. } => {
                Some("Fix or delete the configuration file; defaults will be used.".into())
            }
        }
    }
}

/// Result type alias for synchronization operations.
pub type Result<T> = std::result::Result<T, SyncError>;
