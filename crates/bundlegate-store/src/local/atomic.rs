//! Atomic write primitives
//!
//! Uses temp→rename so readers never observe a partial file. The temp name
//! is unique per call, so concurrent writers of the same target do not
//! trample each other's temp file.

use crate::errors::{io_error, Result};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

fn temp_path_for(target_path: &Path) -> PathBuf {
    let mut name = target_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".{}.tmp", Uuid::new_v4().simple()));
    target_path.with_file_name(name)
}

/// Atomically write bytes to a file, creating parent directories
pub fn atomic_write(target_path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = target_path.parent() {
        fs::create_dir_all(parent).map_err(|e| io_error("create_store_dir", e))?;
    }

    let temp_path = temp_path_for(target_path);
    fs::write(&temp_path, content).map_err(|e| io_error("write_store_temp", e))?;

    if let Err(e) = fs::rename(&temp_path, target_path) {
        let _ = fs::remove_file(&temp_path);
        return Err(io_error("rename_store_temp", e));
    }

    Ok(())
}
