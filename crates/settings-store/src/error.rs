//! Store error types.
//!
//! All store operations return structured errors that provide
//! user-friendly messages and optional remediation hints.

use std::path::PathBuf;
use thiserror::Error;

/// Store operation error.
#[derive(Debug, Error)]
pub enum StoreError {
    /// File I/O error.
    #[error("Failed to {operation} settings file: {path}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The settings file exists but is not a JSON object.
    #[error("Invalid settings file format: {path}")]
    InvalidFormat { path: PathBuf, reason: String },

    /// Serialization error.
    #[error("Failed to serialize settings")]
    Serialization {
        #[source]
        source: serde_json::Error,
    },

    /// Deserialization error.
    #[error("Failed to deserialize settings file: {path}")]
    Deserialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Atomic write failed (temp file couldn't be renamed).
    #[error("Failed to complete save operation")]
    AtomicWriteFailed {
        temp_path: PathBuf,
        target_path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The blocking I/O task panicked or was cancelled.
    #[error("Background store task failed")]
    TaskFailed {
        #[source]
        source: tokio::task::JoinError,
    },

    /// The store refused the operation (used by test doubles).
    #[error("Store unavailable: {reason}")]
    Unavailable { reason: String },
}

impl StoreError {
    /// Get a user-friendly message for this error.
    pub fn user_message(&self) -> String {
        match self {
            Self::Io {
                operation, path, ..
            } => {
                format!("Could not {} the settings file at {}", operation, path.display())
            }
            Self::InvalidFormat { path, reason } => {
                format!(
                    "The settings file at {} is not valid: {}",
                    path.display(),
                    reason
                )
            }
            Self::Serialization { .. } => {
                "An error occurred while saving the settings.".to_string()
            }
            Self::Deserialization { path, .. } => {
                format!(
                    "The settings file at {} could not be read. It may be corrupted.",
                    path.display()
                )
            }
            Self::AtomicWriteFailed { target_path, .. } => {
                format!(
                    "Could not save the settings to {}. Please check disk space and permissions.",
                    target_path.display()
                )
            }
            Self::TaskFailed { .. } => {
                "A background settings operation was interrupted.".to_string()
            }
            Self::Unavailable { reason } => format!("The settings store is unavailable: {reason}"),
        }
    }

    /// Get a suggestion for how to resolve this error.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::Io { operation, .. } => {
                if *operation == "read" {
                    Some("Check that you have permission to read the settings file.".into())
                } else {
                    Some("Check that you have permission to write to the config directory.".into())
                }
            }
            Self::InvalidFormat { .. } | Self::Deserialization { .. } => {
                Some("Remove or repair the settings file; defaults will be used.".into())
            }
            Self::Serialization { .. } | Self::TaskFailed { .. } | Self::Unavailable { .. } => {
                None
            }
            Self::AtomicWriteFailed { .. } => {
                Some("Free up disk space or check permissions on the config directory.".into())
            }
        }
    }
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_mentions_path() {
        let error = StoreError::Io {
            operation: "read",
            path: PathBuf::from("/tmp/.settings.dat"),
            source: std::io::Error::other("denied"),
        };
        assert!(error.user_message().contains("/tmp/.settings.dat"));
        assert!(error.suggestion().is_some());
    }

    #[test]
    fn test_unavailable_has_no_suggestion() {
        let error = StoreError::Unavailable {
            reason: "injected".to_string(),
        };
        assert_eq!(error.to_string(), "Store unavailable: injected");
        assert!(error.suggestion().is_none());
    }
}
