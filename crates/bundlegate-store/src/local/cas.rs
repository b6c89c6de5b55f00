//! Content-addressed payload storage

use super::atomic::atomic_write;
use super::sharding::shard_path;
use crate::errors::{cas_collision, cas_missing, io_error, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

const PAYLOAD_EXTENSION: &str = "bin";

/// Filesystem CAS for bundle payloads
#[derive(Debug, Clone)]
pub struct PayloadCas {
    root: PathBuf,
}

impl PayloadCas {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Upper case hex SHA-256 of `content`
    pub fn digest_of(content: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content);
        hex::encode_upper(hasher.finalize())
    }

    fn path_of(&self, digest: &str) -> PathBuf {
        shard_path(&self.root, digest, PAYLOAD_EXTENSION)
    }

    /// Store `content` and return its digest
    ///
    /// Writing identical content twice is a no-op; different content under
    /// an existing digest is a collision.
    pub fn write(&self, content: &[u8]) -> Result<String> {
        let digest = Self::digest_of(content);
        let target_path = self.path_of(&digest);

        if target_path.exists() {
            let existing = fs::read(&target_path).map_err(|e| io_error("read_cas", e))?;
            if existing == content {
                return Ok(digest);
            }
            return Err(cas_collision(&digest));
        }

        atomic_write(&target_path, content)?;
        Ok(digest)
    }

    pub fn read(&self, digest: &str) -> Result<Vec<u8>> {
        let path = self.path_of(digest);
        if !path.exists() {
            return Err(cas_missing(digest));
        }
        fs::read(&path).map_err(|e| io_error("read_cas", e))
    }

    pub fn contains(&self, digest: &str) -> bool {
        self.path_of(digest).exists()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}
