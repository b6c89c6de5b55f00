//! Gateway facade
//!
//! Holds the injected store client, identity source and staging area, and
//! exposes the provider-style operations. Each operation runs under its own
//! `RequestContext`; the `*_with_context` variants let callers supply one
//! to correlate logs and staging names with their own request.

use crate::commands;
use crate::handle::PayloadHandle;
use crate::staging::StagingArea;
use bundlegate_core::{BundleTable, ContentUri, ContentValues, InsertRequest, Result};
use bundlegate_core_types::RequestContext;
use bundlegate_store::{AddOptions, BundleStore, IdentitySource};
use std::fmt;
use std::sync::Arc;

/// Authority used in returned URIs unless configured otherwise
pub const DEFAULT_AUTHORITY: &str = "org.servalproject.files";

/// Filters applied to a `query`, `delete` or `update`
///
/// Only `selection_args` is ever honoured (forwarded to the store as
/// positional listing parameters); the rest exist so callers can state
/// their intent and be told it is unsupported.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub projection: Option<Vec<String>>,
    pub selection: Option<String>,
    pub selection_args: Option<Vec<String>>,
    pub sort_order: Option<String>,
}

impl Selection {
    /// Listing filters only
    pub fn args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            selection_args: Some(args.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }
}

#[derive(Clone)]
pub struct Gateway {
    store: Arc<dyn BundleStore>,
    identity: Arc<dyn IdentitySource>,
    staging: Arc<StagingArea>,
    authority: String,
}

impl Gateway {
    pub fn new(
        store: Arc<dyn BundleStore>,
        identity: Arc<dyn IdentitySource>,
        staging: Arc<StagingArea>,
    ) -> Self {
        Self {
            store,
            identity,
            staging,
            authority: DEFAULT_AUTHORITY.to_string(),
        }
    }

    pub fn with_authority(mut self, authority: impl Into<String>) -> Self {
        self.authority = authority.into();
        self
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    pub fn store(&self) -> &dyn BundleStore {
        self.store.as_ref()
    }

    pub fn identity(&self) -> &dyn IdentitySource {
        self.identity.as_ref()
    }

    pub fn staging(&self) -> &StagingArea {
        &self.staging
    }

    /// Publish a payload and/or manifest as a bundle
    ///
    /// # Errors
    ///
    /// - `InvalidInput`: a named file is missing or an override is malformed
    /// - `UnsupportedOperation`: a name override against a non-file manifest
    /// - `OperationFailed`: anything the store or the filesystem rejected
    pub fn insert(&self, request: &InsertRequest) -> Result<ContentUri> {
        self.insert_with_context(&RequestContext::new(), request, None)
    }

    /// Insert from a loose key/value bag
    ///
    /// # Errors
    ///
    /// As [`Gateway::insert`]; a malformed value is `InvalidInput`.
    pub fn insert_values(&self, values: &ContentValues) -> Result<ContentUri> {
        commands::insert::insert_values(self, &RequestContext::new(), values)
    }

    /// Insert with a caller-supplied context and store options
    ///
    /// # Errors
    ///
    /// As [`Gateway::insert`].
    pub fn insert_with_context(
        &self,
        ctx: &RequestContext,
        request: &InsertRequest,
        options: Option<&AddOptions>,
    ) -> Result<ContentUri> {
        commands::insert::insert(self, ctx, request, options)
    }

    /// List bundles under the root URI
    ///
    /// # Errors
    ///
    /// - `UnsupportedOperation`: a non-root path, projection or selection
    /// - `InvalidInput`: the store rejected the listing
    pub fn query(&self, uri: &ContentUri, selection: &Selection) -> Result<BundleTable> {
        self.query_with_context(&RequestContext::new(), uri, selection)
    }

    /// # Errors
    ///
    /// As [`Gateway::query`].
    pub fn query_with_context(
        &self,
        ctx: &RequestContext,
        uri: &ContentUri,
        selection: &Selection,
    ) -> Result<BundleTable> {
        commands::query::query(self, ctx, uri, selection)
    }

    /// Open a bundle's payload for reading
    ///
    /// # Errors
    ///
    /// - `PermissionDenied`: `mode` asks for write access
    /// - `NotFound`: bad URI, unknown bundle, or extraction failure
    pub fn open(&self, uri: &ContentUri, mode: &str) -> Result<PayloadHandle> {
        self.open_with_context(&RequestContext::new(), uri, mode)
    }

    /// # Errors
    ///
    /// As [`Gateway::open`].
    pub fn open_with_context(
        &self,
        ctx: &RequestContext,
        uri: &ContentUri,
        mode: &str,
    ) -> Result<PayloadHandle> {
        commands::open::open(self, ctx, uri, mode)
    }

    /// # Errors
    ///
    /// Always `UnsupportedOperation`.
    pub fn delete(&self, uri: &ContentUri, selection: &Selection) -> Result<usize> {
        commands::unsupported::delete(&RequestContext::new(), uri, selection)
    }

    /// # Errors
    ///
    /// Always `UnsupportedOperation`.
    pub fn update(
        &self,
        uri: &ContentUri,
        values: &ContentValues,
        selection: &Selection,
    ) -> Result<usize> {
        commands::unsupported::update(&RequestContext::new(), uri, values, selection)
    }

    /// # Errors
    ///
    /// Always `UnsupportedOperation`.
    pub fn get_type(&self, uri: &ContentUri) -> Result<String> {
        commands::unsupported::get_type(&RequestContext::new(), uri)
    }
}

impl fmt::Debug for Gateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gateway")
            .field("authority", &self.authority)
            .field("staging", &self.staging.root())
            .finish_non_exhaustive()
    }
}
