//! Window identity.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Label of the window (execution context) that owns a set of cells.
///
/// Announcements carry the writer's label so receivers can drop their own
/// echoes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(String);

impl WindowId {
    /// Label conventionally used for the application's primary window.
    pub const MAIN: &'static str = "main";

    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    /// The primary window's id.
    pub fn main() -> Self {
        Self::new(Self::MAIN)
    }

    /// One-time, application-wide work (registering global shortcuts, etc.)
    /// is usually restricted to the main window.
    pub fn is_main(&self) -> bool {
        self.0 == Self::MAIN
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WindowId {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

impl From<String> for WindowId {
    fn from(label: String) -> Self {
        Self(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_main_window() {
        assert!(WindowId::main().is_main());
        assert!(!WindowId::from("popup").is_main());
        assert_eq!(WindowId::from("popup").to_string(), "popup");
    }
}
