//! Channel error types.

use thiserror::Error;

/// Change channel error.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// Markers must be addressed to a key.
    #[error("Change channel keys must not be empty")]
    EmptyKey,
}

impl ChannelError {
    /// Get a user-friendly message for this error.
    pub fn user_message(&self) -> String {
        match self {
            Self::EmptyKey => "A setting change could not be announced.".to_string(),
        }
    }

    /// Get a suggestion for how to resolve this error.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::EmptyKey => Some("Give every persisted setting a non-empty key.".into()),
        }
    }
}

/// Result type alias for channel operations.
pub type Result<T> = std::result::Result<T, ChannelError>;
