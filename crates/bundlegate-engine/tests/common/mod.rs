// Shared fixtures for gateway integration tests
#![allow(dead_code)]

use bundlegate_core::{BundleId, BundleTable, GwError, GwErrorKind, SubscriberId};
use bundlegate_engine::{Gateway, StagingArea};
use bundlegate_store::{
    AddBundleResult, AddOptions, BundleStore, LocalStore, Result, StaticIdentity,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub const TEST_AUTHORITY: &str = "org.example.files";

/// One observed store call, with staged files captured at call time
#[derive(Debug, Clone)]
pub enum Call {
    Add {
        payload: Option<PathBuf>,
        manifest: Option<Vec<u8>>,
        author: Option<SubscriberId>,
    },
    List(Vec<String>),
    ExtractPayload(BundleId),
    ExtractManifest(BundleId),
}

/// Store double that records every call and delegates to a `LocalStore`
pub struct RecordingStore {
    inner: LocalStore,
    calls: Mutex<Vec<Call>>,
    fail_add: Option<String>,
    fail_list: Option<String>,
}

impl RecordingStore {
    pub fn new(root: &Path) -> Self {
        Self {
            inner: LocalStore::new(root),
            calls: Mutex::new(Vec::new()),
            fail_add: None,
            fail_list: None,
        }
    }

    pub fn failing_add(mut self, message: &str) -> Self {
        self.fail_add = Some(message.to_string());
        self
    }

    pub fn failing_list(mut self, message: &str) -> Self {
        self.fail_list = Some(message.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn adds(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Add { .. }))
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

fn daemon_error(op: &str, message: &str) -> GwError {
    GwError::new(GwErrorKind::ExternalService)
        .with_op(op)
        .with_message(message.to_string())
}

impl BundleStore for RecordingStore {
    fn add_bundle(
        &self,
        payload: Option<&Path>,
        manifest: Option<&Path>,
        author: Option<&SubscriberId>,
        options: Option<&AddOptions>,
    ) -> Result<AddBundleResult> {
        self.record(Call::Add {
            payload: payload.map(Path::to_path_buf),
            manifest: manifest.map(|p| fs::read(p).unwrap()),
            author: author.copied(),
        });
        if let Some(message) = &self.fail_add {
            return Err(daemon_error("rhizome_add", message));
        }
        self.inner.add_bundle(payload, manifest, author, options)
    }

    fn list_bundles(&self, args: &[String]) -> Result<BundleTable> {
        self.record(Call::List(args.to_vec()));
        if let Some(message) = &self.fail_list {
            return Err(daemon_error("rhizome_list", message));
        }
        self.inner.list_bundles(args)
    }

    fn extract_payload(&self, id: &BundleId, dest: &Path) -> Result<()> {
        self.record(Call::ExtractPayload(*id));
        self.inner.extract_payload(id, dest)
    }

    fn extract_manifest(&self, id: &BundleId, dest: &Path) -> Result<()> {
        self.record(Call::ExtractManifest(*id));
        self.inner.extract_manifest(id, dest)
    }
}

pub struct Fixture {
    pub dir: TempDir,
    pub store: Arc<RecordingStore>,
    pub gateway: Gateway,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with(|store| store, None)
    }

    pub fn with_default_author(author: SubscriberId) -> Self {
        Self::with(|store| store, Some(author))
    }

    pub fn with<F>(configure: F, default_author: Option<SubscriberId>) -> Self
    where
        F: FnOnce(RecordingStore) -> RecordingStore,
    {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let store = Arc::new(configure(RecordingStore::new(&dir.path().join("store"))));
        let staging = Arc::new(StagingArea::new(dir.path().join("staging")));
        let gateway = Gateway::new(
            store.clone(),
            Arc::new(StaticIdentity(default_author)),
            staging,
        )
        .with_authority(TEST_AUTHORITY);
        Self {
            dir,
            store,
            gateway,
        }
    }

    pub fn write_file(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, bytes).unwrap();
        path
    }

    /// Entries currently left in the staging directory
    pub fn staging_entries(&self) -> Vec<PathBuf> {
        match fs::read_dir(self.gateway.staging().root()) {
            Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
            Err(_) => Vec::new(),
        }
    }
}
