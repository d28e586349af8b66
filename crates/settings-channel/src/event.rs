//! Change events.

/// A change to one key of the channel's ephemeral key space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Key that changed.
    pub key: String,
    /// Value before the change, if any.
    pub old_value: Option<String>,
    /// Value after the change; `None` when the key was cleared.
    pub new_value: Option<String>,
}

impl ChangeEvent {
    /// Event for `key` being set to `value`.
    pub fn written(key: impl Into<String>, old_value: Option<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            old_value,
            new_value: Some(value.into()),
        }
    }

    /// Event for `key` being removed.
    pub fn cleared(key: impl Into<String>, old_value: String) -> Self {
        Self {
            key: key.into(),
            old_value: Some(old_value),
            new_value: None,
        }
    }

    /// True for the "clear" half of a write-then-clear announcement.
    pub fn is_clear(&self) -> bool {
        self.new_value.as_deref().is_none_or(str::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_clear() {
        assert!(!ChangeEvent::written("theme", None, "main").is_clear());
        assert!(ChangeEvent::cleared("theme", "main".to_string()).is_clear());
        assert!(ChangeEvent::written("theme", None, "").is_clear());
    }
}
