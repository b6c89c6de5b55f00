//! Store client contract
//!
//! The gateway only ever talks to the store through these traits. Every
//! call blocks until the store answers; timeouts, retries and serialization
//! of concurrent mutations are the implementation's business.

use crate::errors::Result;
use bundlegate_core::{BundleId, BundleTable, SubscriberId};
use bundlegate_core_types::Sensitive;
use std::path::Path;

/// Extra knobs for `add_bundle`
#[derive(Debug, Clone, Default)]
pub struct AddOptions {
    /// Secret that lets the store update an existing bundle it did not author
    pub bundle_secret: Option<Sensitive<String>>,
}

/// What the store reports after adding a bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddBundleResult {
    pub bundle_id: BundleId,
    pub version: Option<u64>,
    pub service: Option<String>,
    pub name: Option<String>,
    pub filesize: Option<u64>,
    pub filehash: Option<String>,
}

impl AddBundleResult {
    pub fn new(bundle_id: BundleId) -> Self {
        Self {
            bundle_id,
            version: None,
            service: None,
            name: None,
            filesize: None,
            filehash: None,
        }
    }
}

/// Operations of the external bundle store
pub trait BundleStore: Send + Sync {
    /// Add or update a bundle from an optional payload and optional manifest
    fn add_bundle(
        &self,
        payload: Option<&Path>,
        manifest: Option<&Path>,
        author: Option<&SubscriberId>,
        options: Option<&AddOptions>,
    ) -> Result<AddBundleResult>;

    /// List bundles; `args` are positional filters the store interprets
    fn list_bundles(&self, args: &[String]) -> Result<BundleTable>;

    /// Write the bundle's payload to `dest`
    fn extract_payload(&self, id: &BundleId, dest: &Path) -> Result<()>;

    /// Write the bundle's canonical manifest to `dest`
    fn extract_manifest(&self, id: &BundleId, dest: &Path) -> Result<()>;
}

/// Source of the acting identity's default author
pub trait IdentitySource: Send + Sync {
    fn default_author(&self) -> Result<Option<SubscriberId>>;
}

/// Fixed identity, typically from configuration
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity(pub Option<SubscriberId>);

impl IdentitySource for StaticIdentity {
    fn default_author(&self) -> Result<Option<SubscriberId>> {
        Ok(self.0)
    }
}
