//! Staging area for files crossing the store boundary
//!
//! One directory per process (or per gateway, when injected), created on
//! first use. Creation is serialized by a single lock; once the directory
//! exists nothing is locked. Every staged name embeds the request id, so
//! concurrent requests never share a path.
//!
//! On Unix the directory must be owned by the current user with no group
//! or world access. It is created with mode 0700, and an existing
//! directory that fails the check is refused rather than reused.

use bundlegate_core::errors::io_error;
use bundlegate_core::{BundleId, GwError, GwErrorKind, Result};
use bundlegate_core_types::RequestContext;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};
use tempfile::NamedTempFile;

/// Directory name prefix used under the system temp dir by the process default
pub const DEFAULT_STAGING_DIR_NAME: &str = "bundlegate";

/// Mode of a freshly created staging directory
#[cfg(unix)]
const STAGING_DIR_MODE: u32 = 0o700;

/// Extension of staged payload extractions
pub const STAGED_PAYLOAD_SUFFIX: &str = "tmp";

const STAGED_MANIFEST_PREFIX: &str = "manifest-";
const STAGED_MANIFEST_SUFFIX: &str = ".temp";

static PROCESS_STAGING: OnceLock<Arc<StagingArea>> = OnceLock::new();

#[derive(Debug)]
pub struct StagingArea {
    root: PathBuf,
    create_lock: Mutex<()>,
}

impl StagingArea {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            create_lock: Mutex::new(()),
        }
    }

    /// Shared staging area under the system temp directory
    ///
    /// The directory name carries the user id, so users sharing a temp
    /// directory never contend for the same path.
    pub fn process_default() -> Arc<StagingArea> {
        PROCESS_STAGING
            .get_or_init(|| {
                Arc::new(StagingArea::new(
                    std::env::temp_dir().join(default_dir_name()),
                ))
            })
            .clone()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the directory if needed and return it
    ///
    /// Idempotent and safe to call from many threads at once.
    pub fn ensure_dir(&self) -> Result<&Path> {
        match fs::symlink_metadata(&self.root) {
            Ok(meta) => {
                check_private(&self.root, &meta)?;
                return Ok(&self.root);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(io_error("inspect_staging_dir", e)),
        }
        let _guard = self.create_lock.lock().map_err(|_| {
            GwError::new(GwErrorKind::Internal)
                .with_op("create_staging_dir")
                .with_message("staging creation lock poisoned")
        })?;
        create_private_dir(&self.root).map_err(|e| io_error("create_staging_dir", e))?;
        let meta =
            fs::symlink_metadata(&self.root).map_err(|e| io_error("inspect_staging_dir", e))?;
        check_private(&self.root, &meta)?;
        tracing::debug!(staging_dir = %self.root.display(), "Staging directory ready");
        Ok(&self.root)
    }

    /// Write serialized manifest bytes into a fresh staging file
    ///
    /// The file is removed when the returned handle is dropped or closed.
    pub fn stage_manifest(&self, ctx: &RequestContext, bytes: &[u8]) -> Result<NamedTempFile> {
        let dir = self.ensure_dir()?;
        let prefix = format!(
            "{}{}-",
            STAGED_MANIFEST_PREFIX,
            ctx.request_id.file_suffix()
        );
        let mut file = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(STAGED_MANIFEST_SUFFIX)
            .tempfile_in(dir)
            .map_err(|e| io_error("create_staged_manifest", e))?;
        file.write_all(bytes)
            .and_then(|_| file.flush())
            .map_err(|e| io_error("write_staged_manifest", e))?;
        Ok(file)
    }

    /// Reserve the staging path a payload extraction will be written to
    ///
    /// `<root>/<BUNDLE_ID>.<request>.tmp`. Nothing is created; the guard
    /// removes whatever ends up at the path unless it was already removed.
    pub fn payload_path(&self, ctx: &RequestContext, id: &BundleId) -> Result<StagedPath> {
        let dir = self.ensure_dir()?;
        let path = dir.join(format!(
            "{}.{}.{}",
            id.to_hex(),
            ctx.request_id.file_suffix(),
            STAGED_PAYLOAD_SUFFIX
        ));
        Ok(StagedPath {
            path,
            removed: false,
        })
    }
}

#[cfg(unix)]
fn default_dir_name() -> String {
    // SAFETY: getuid has no preconditions and cannot fail
    let uid = unsafe { libc::getuid() };
    format!("{}-{}", DEFAULT_STAGING_DIR_NAME, uid)
}

#[cfg(not(unix))]
fn default_dir_name() -> String {
    DEFAULT_STAGING_DIR_NAME.to_string()
}

#[cfg(unix)]
fn create_private_dir(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new()
        .recursive(true)
        .mode(STAGING_DIR_MODE)
        .create(path)
}

#[cfg(not(unix))]
fn create_private_dir(path: &Path) -> std::io::Result<()> {
    fs::create_dir_all(path)
}

fn refuse_staging_dir(path: &Path, reason: String) -> GwError {
    GwError::new(GwErrorKind::Io)
        .with_op("inspect_staging_dir")
        .with_message(format!(
            "staging directory {} is not private: {}",
            path.display(),
            reason
        ))
}

/// The root must be a real directory, owned by us, closed to group and world
#[cfg(unix)]
fn check_private(path: &Path, meta: &fs::Metadata) -> Result<()> {
    use std::os::unix::fs::MetadataExt;
    if !meta.is_dir() {
        return Err(refuse_staging_dir(path, "not a directory".to_string()));
    }
    // SAFETY: geteuid has no preconditions and cannot fail
    let euid = unsafe { libc::geteuid() };
    if meta.uid() != euid {
        return Err(refuse_staging_dir(
            path,
            format!("owned by uid {}, expected {}", meta.uid(), euid),
        ));
    }
    let mode = meta.mode() & 0o777;
    if mode & 0o077 != 0 {
        return Err(refuse_staging_dir(
            path,
            format!("mode {:o} grants group or world access", mode),
        ));
    }
    Ok(())
}

#[cfg(not(unix))]
fn check_private(path: &Path, meta: &fs::Metadata) -> Result<()> {
    if !meta.is_dir() {
        return Err(refuse_staging_dir(path, "not a directory".to_string()));
    }
    Ok(())
}

/// A staging path that is removed when the guard goes out of scope
#[derive(Debug)]
pub struct StagedPath {
    path: PathBuf,
    removed: bool,
}

impl StagedPath {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the directory entry now, reporting failures
    pub fn remove(mut self) -> Result<()> {
        self.removed = true;
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error("remove_staged_file", e)),
        }
    }
}

impl Drop for StagedPath {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                staging_path = %self.path.display(),
                error = %e,
                "Failed to remove staged file"
            ),
        }
    }
}
