//! Settings file saving.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::{Result, StoreError};

/// Serialize the entry map to the on-disk representation.
pub(crate) fn serialize_entries(entries: &Map<String, Value>) -> Result<Vec<u8>> {
    serde_json::to_vec_pretty(entries).map_err(|e| StoreError::Serialization { source: e })
}

/// Write bytes to `path`.
///
/// Uses atomic write (temp file + rename) so a crash mid-write never leaves
/// a truncated settings file behind.
pub(crate) fn write_atomic(bytes: &[u8], path: &Path) -> Result<()> {
    let temp_path = temp_path_for(path);

    // Create parent directory if needed
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| StoreError::Io {
            operation: "create directory",
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let mut file = File::create(&temp_path).map_err(|e| StoreError::Io {
        operation: "create",
        path: temp_path.clone(),
        source: e,
    })?;

    file.write_all(bytes).map_err(|e| StoreError::Io {
        operation: "write",
        path: temp_path.clone(),
        source: e,
    })?;

    file.sync_all().map_err(|e| StoreError::Io {
        operation: "sync",
        path: temp_path.clone(),
        source: e,
    })?;

    fs::rename(&temp_path, path).map_err(|e| StoreError::AtomicWriteFailed {
        temp_path: temp_path.clone(),
        target_path: path.to_path_buf(),
        source: e,
    })?;

    tracing::debug!("Saved settings to {}", path.display());
    Ok(())
}

/// Write bytes on the blocking thread pool.
pub(crate) async fn write_atomic_async(bytes: Vec<u8>, path: PathBuf) -> Result<()> {
    tokio::task::spawn_blocking(move || write_atomic(&bytes, &path))
        .await
        .map_err(|e| StoreError::TaskFailed { source: e })?
}

/// `.settings.dat` -> `.settings.dat.tmp`, in the same directory so the
/// rename stays on one filesystem.
fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(std::ffi::OsStr::to_os_string)
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
