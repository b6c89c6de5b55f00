//! Sharding logic for payload storage
//!
//! Blobs live in subdirectories named after the first 2 hex characters of
//! their digest so no single directory grows unbounded.

use std::path::{Path, PathBuf};

/// For digest "ABC123...", returns "<root>/AB/ABC123.<ext>"
pub fn shard_path(root: &Path, digest: &str, extension: &str) -> PathBuf {
    let shard = &digest[..2.min(digest.len())];

    root.join(shard).join(format!("{}.{}", digest, extension))
}
