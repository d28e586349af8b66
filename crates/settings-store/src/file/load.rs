//! Settings file loading.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::{Result, StoreError};

/// Load all entries from a settings file.
///
/// A missing file is an empty store, not an error.
pub(crate) fn load_entries(path: &Path) -> Result<Map<String, Value>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!("No settings file at {}, starting empty", path.display());
            return Ok(Map::new());
        }
        Err(e) => {
            return Err(StoreError::Io {
                operation: "read",
                path: path.to_path_buf(),
                source: e,
            });
        }
    };

    parse_entries(&bytes, path)
}

/// Load entries on the blocking thread pool.
pub(crate) async fn load_entries_async(path: PathBuf) -> Result<Map<String, Value>> {
    tokio::task::spawn_blocking(move || load_entries(&path))
        .await
        .map_err(|e| StoreError::TaskFailed { source: e })?
}

/// Parse file bytes into the top-level entry map.
fn parse_entries(bytes: &[u8], path: &Path) -> Result<Map<String, Value>> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }

    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| StoreError::Deserialization {
            path: path.to_path_buf(),
            source: e,
        })?;

    match value {
        Value::Object(entries) => {
            tracing::debug!("Loaded {} settings from {}", entries.len(), path.display());
            Ok(entries)
        }
        other => Err(StoreError::InvalidFormat {
            path: path.to_path_buf(),
            reason: format!("expected a JSON object at the top level, found {}", kind(&other)),
        }),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let entries = load_entries(&dir.path().join(".settings.dat")).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_blank_file_is_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".settings.dat");
        fs::write(&path, b"  \n").unwrap();

        assert!(load_entries(&path).unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".settings.dat");
        fs::write(&path, b"{\"theme\": ").unwrap();

        let result = load_entries(&path);
        assert!(matches!(result, Err(StoreError::Deserialization { .. })));
    }

    #[test]
    fn test_top_level_must_be_object() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".settings.dat");
        fs::write(&path, b"[1, 2, 3]").unwrap();

        match load_entries(&path) {
            Err(StoreError::InvalidFormat { reason, .. }) => assert!(reason.contains("an array")),
            other => panic!("expected InvalidFormat, got {other:?}"),
        }
    }
}
