use super::atomic::atomic_write;
use super::cas::PayloadCas;
use crate::client::{AddBundleResult, AddOptions, BundleStore};
use crate::errors::{bad_list_args, bundle_missing, io_error, store_failure, Result};
use bundlegate_core::{BundleId, BundleTable, GwError, Manifest, SubscriberId};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use uuid::Uuid;

const MANIFEST_EXTENSION: &str = "manifest";

/// Columns produced by `list_bundles`, in order
pub const LIST_COLUMNS: [&str; 8] = [
    "id", "version", "date", "service", "name", "filesize", "filehash", "author",
];

/// Filesystem store with the same contract as the daemon
///
/// Layout under `root`:
/// - `payloads/<AB>/<digest>.bin`: content-addressed payloads
/// - `bundles/<BUNDLE_ID>.manifest`: the current manifest of each bundle
///
/// The store owns the derived fields: it computes `filehash` and
/// `filesize` from the payload and refuses a manifest whose declared hash
/// disagrees with the payload it was submitted with.
pub struct LocalStore {
    root: PathBuf,
    payloads: PayloadCas,
    write_lock: Mutex<()>,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            payloads: PayloadCas::new(root.join("payloads")),
            root,
            write_lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn bundles_dir(&self) -> PathBuf {
        self.root.join("bundles")
    }

    fn manifest_path(&self, id: &BundleId) -> PathBuf {
        self.bundles_dir()
            .join(format!("{}.{}", id.to_hex(), MANIFEST_EXTENSION))
    }

    /// Current manifest of a bundle, if it exists
    pub fn load_manifest(&self, id: &BundleId) -> Result<Option<Manifest>> {
        let path = self.manifest_path(id);
        if !path.exists() {
            return Ok(None);
        }
        Manifest::read_from_path(&path)
            .map(Some)
            .map_err(GwError::from)
    }

    fn all_manifests(&self) -> Result<Vec<Manifest>> {
        let dir = self.bundles_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut manifests = Vec::new();
        for entry in fs::read_dir(&dir).map_err(|e| io_error("list_bundles", e))? {
            let path = entry.map_err(|e| io_error("list_bundles", e))?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(MANIFEST_EXTENSION) {
                continue;
            }
            manifests.push(Manifest::read_from_path(&path).map_err(GwError::from)?);
        }
        Ok(manifests)
    }

    fn fresh_bundle_id() -> BundleId {
        let mut hasher = Sha256::new();
        hasher.update(Uuid::new_v4().as_bytes());
        hasher.update(Uuid::now_v7().as_bytes());
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&hasher.finalize());
        BundleId::from_bytes(bytes)
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

impl BundleStore for LocalStore {
    fn add_bundle(
        &self,
        payload: Option<&Path>,
        manifest: Option<&Path>,
        author: Option<&SubscriberId>,
        _options: Option<&AddOptions>,
    ) -> Result<AddBundleResult> {
        let op = "local_add";
        if payload.is_none() && manifest.is_none() {
            return Err(store_failure(op, "nothing to add: no payload and no manifest"));
        }

        let mut manifest = match manifest {
            Some(path) => Manifest::read_from_path(path)
                .map_err(|e| store_failure(op, format!("invalid manifest: {}", e)))?,
            None => Manifest::file(),
        };

        if let Some(path) = payload {
            let bytes = fs::read(path).map_err(|e| io_error("read_payload", e))?;
            let digest = PayloadCas::digest_of(&bytes);
            if let Some(declared) = manifest.filehash() {
                if declared != digest {
                    return Err(store_failure(
                        op,
                        format!("manifest filehash {} does not match payload {}", declared, digest),
                    ));
                }
            }
            if let Some(declared) = manifest.filesize() {
                if declared != bytes.len() as u64 {
                    return Err(store_failure(
                        op,
                        format!(
                            "manifest filesize {} does not match payload size {}",
                            declared,
                            bytes.len()
                        ),
                    ));
                }
            }
            self.payloads.write(&bytes)?;
            manifest.set_filehash(digest);
            manifest.set_filesize(bytes.len() as u64);

            let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned());
            if let (Some(fields), Some(file_name)) = (manifest.as_file_mut(), file_name) {
                if fields.name().is_none() {
                    fields.set_name(file_name);
                }
            }
        }

        manifest.set_author(author.copied());

        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| store_failure(op, "store write lock poisoned"))?;

        let id = match manifest.id() {
            Some(id) => *id,
            None => Self::fresh_bundle_id(),
        };
        manifest.set_id(id);

        let existing = self.load_manifest(&id)?;
        if payload.is_none() && manifest.filehash().is_none() {
            match existing.as_ref().and_then(|m| m.filehash().map(|h| (h, m.filesize()))) {
                Some((hash, size)) => {
                    manifest.set_filehash(hash);
                    manifest.set_filesize(size.unwrap_or(0));
                }
                None => manifest.set_filesize(0),
            }
        }

        let now = now_millis();
        let version = manifest.version().unwrap_or(now.max(0) as u64);
        if let Some(current) = existing.as_ref().and_then(|m| m.version()) {
            if version <= current {
                return Err(store_failure(
                    op,
                    format!("bundle {} already has version {} (submitted {})", id, current, version),
                )
                .with_bundle_id(id.to_hex()));
            }
        }
        manifest.set_version(version);
        if manifest.date_millis().is_none() {
            manifest.set_date_millis(now);
        }

        let encoded = manifest.to_bytes().map_err(GwError::from)?;
        atomic_write(&self.manifest_path(&id), &encoded)?;

        tracing::debug!(
            bundle_id = %id,
            version,
            filesize = manifest.filesize().unwrap_or(0),
            "Stored bundle"
        );

        let mut result = AddBundleResult::new(id);
        result.version = Some(version);
        result.service = Some(manifest.service().to_string());
        result.name = manifest.as_file().and_then(|f| f.name()).map(str::to_string);
        result.filesize = manifest.filesize();
        result.filehash = manifest.filehash().map(str::to_string);
        Ok(result)
    }

    /// Positional filters: `[service [name [offset [limit]]]]`
    ///
    /// Empty strings mean "no filter".
    fn list_bundles(&self, args: &[String]) -> Result<BundleTable> {
        if args.len() > 4 {
            return Err(bad_list_args(format!(
                "at most 4 list arguments (service, name, offset, limit), got {}",
                args.len()
            )));
        }
        let arg = |i: usize| args.get(i).map(String::as_str).filter(|s| !s.is_empty());
        let number = |i: usize, what: &str| -> Result<Option<usize>> {
            arg(i)
                .map(|v| {
                    v.parse::<usize>()
                        .map_err(|_| bad_list_args(format!("{} must be a number, got {:?}", what, v)))
                })
                .transpose()
        };
        let service = arg(0);
        let name = arg(1);
        let offset = number(2, "offset")?.unwrap_or(0);
        let limit = number(3, "limit")?;

        let mut manifests: Vec<Manifest> = self
            .all_manifests()?
            .into_iter()
            .filter(|m| service.map_or(true, |s| m.service() == s))
            .filter(|m| name.map_or(true, |n| m.as_file().and_then(|f| f.name()) == Some(n)))
            .collect();
        manifests.sort_by(|a, b| {
            b.date_millis()
                .cmp(&a.date_millis())
                .then_with(|| a.id().cmp(&b.id()))
        });

        let mut table = BundleTable::new(LIST_COLUMNS.iter().map(|c| c.to_string()).collect());
        let selected = manifests
            .iter()
            .skip(offset)
            .take(limit.unwrap_or(usize::MAX));
        for m in selected {
            let opt = |v: Option<String>| v.unwrap_or_default();
            table.push_row(vec![
                opt(m.id().map(|i| i.to_hex())),
                opt(m.version().map(|v| v.to_string())),
                opt(m.date_millis().map(|d| d.to_string())),
                m.service().to_string(),
                opt(m.as_file().and_then(|f| f.name()).map(str::to_string)),
                opt(m.filesize().map(|s| s.to_string())),
                opt(m.filehash().map(str::to_string)),
                opt(m.author().map(|a| a.to_hex())),
            ])?;
        }
        Ok(table)
    }

    fn extract_payload(&self, id: &BundleId, dest: &Path) -> Result<()> {
        let op = "local_extract_payload";
        let manifest = self
            .load_manifest(id)?
            .ok_or_else(|| bundle_missing(op, id))?;

        let bytes = match manifest.filehash() {
            Some(hash) if manifest.filesize().unwrap_or(0) > 0 => self.payloads.read(hash)?,
            _ => Vec::new(),
        };
        atomic_write(dest, &bytes)
    }

    fn extract_manifest(&self, id: &BundleId, dest: &Path) -> Result<()> {
        let op = "local_extract_manifest";
        let path = self.manifest_path(id);
        if !path.exists() {
            return Err(bundle_missing(op, id));
        }
        let bytes = fs::read(&path).map_err(|e| io_error(op, e))?;
        atomic_write(dest, &bytes)
    }
}

impl std::fmt::Debug for LocalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStore")
            .field("root", &self.root)
            .finish()
    }
}
