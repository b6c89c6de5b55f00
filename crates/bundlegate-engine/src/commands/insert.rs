//! Insert pipeline
//!
//! ## Order (validation first, no store call until it passes):
//! 1. Existing manifest: must be a readable file; parsed; derived fields cleared
//! 2. Payload: must be a file
//! 3. Author override: `""` means no author, anything else must parse
//! 4. Version / date overrides (a file manifest is created on demand)
//! 5. Name override (file manifests only)
//! 6. Manifest serialized
//!
//! Then the submission phase: resolve the default author if no override was
//! given, stage the manifest, add, drop the staged manifest, optionally save
//! the canonical manifest. Anything failing in submission is
//! `OperationFailed` with the original error as its cause.

use super::at_boundary;
use crate::gateway::Gateway;
use bundlegate_core::core_types::schema::OP_INSERT;
use bundlegate_core::{log_op_end, log_op_error, log_op_start};
use bundlegate_core::{
    ContentUri, ContentValues, GwError, GwErrorKind, InsertRequest, Manifest, Result,
    SubscriberId,
};
use bundlegate_core_types::RequestContext;
use bundlegate_store::AddOptions;
use std::path::Path;
use tempfile::NamedTempFile;

/// Who the bundle is submitted as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthorChoice {
    /// No override; ask the identity source at submission time
    IdentityDefault,
    /// Explicit override; `None` submits without an author
    Explicit(Option<SubscriberId>),
}

#[derive(Debug)]
struct PreparedInsert {
    manifest: Option<Vec<u8>>,
    author: AuthorChoice,
}

pub fn insert(
    gw: &Gateway,
    ctx: &RequestContext,
    request: &InsertRequest,
    options: Option<&AddOptions>,
) -> Result<ContentUri> {
    log_op_start!(
        OP_INSERT,
        request_id = ctx.request_id.as_str(),
        has_payload = request.payload_path.is_some(),
        has_manifest = request.manifest_path.is_some()
    );
    finish(ctx, insert_impl(gw, ctx, request, options))
}

/// Insert from a provider-style value bag
pub fn insert_values(gw: &Gateway, ctx: &RequestContext, values: &ContentValues) -> Result<ContentUri> {
    log_op_start!(OP_INSERT, request_id = ctx.request_id.as_str());
    let result = InsertRequest::from_values(values)
        .and_then(|request| insert_impl(gw, ctx, &request, None));
    finish(ctx, result)
}

fn finish(ctx: &RequestContext, result: Result<ContentUri>) -> Result<ContentUri> {
    match result {
        Ok(uri) => {
            log_op_end!(
                OP_INSERT,
                duration_ms = ctx.elapsed_ms(),
                request_id = ctx.request_id.as_str(),
                uri = %uri
            );
            Ok(uri)
        }
        Err(e) => {
            let e = at_boundary(e, OP_INSERT, ctx);
            log_op_error!(
                OP_INSERT,
                &e,
                duration_ms = ctx.elapsed_ms(),
                request_id = ctx.request_id.as_str()
            );
            Err(e)
        }
    }
}

fn insert_impl(
    gw: &Gateway,
    ctx: &RequestContext,
    request: &InsertRequest,
    options: Option<&AddOptions>,
) -> Result<ContentUri> {
    let prepared = prepare(request).map_err(keep_validation_kind)?;
    submit(gw, ctx, request, prepared, options)
        .map_err(|e| GwError::wrap(GwErrorKind::OperationFailed, e))
}

/// Validation errors keep their kind; anything else is an operation failure
fn keep_validation_kind(err: GwError) -> GwError {
    match err.kind() {
        GwErrorKind::InvalidInput | GwErrorKind::UnsupportedOperation => err,
        _ => GwError::wrap(GwErrorKind::OperationFailed, err),
    }
}

fn invalid_input(message: String) -> GwError {
    GwError::new(GwErrorKind::InvalidInput)
        .with_op(OP_INSERT)
        .with_message(message)
}

fn prepare(request: &InsertRequest) -> Result<PreparedInsert> {
    let mut manifest = match &request.manifest_path {
        Some(path) => Some(load_existing_manifest(path)?),
        None => None,
    };

    if let Some(path) = &request.payload_path {
        if !path.is_file() {
            return Err(invalid_input(format!(
                "Payload file could not be read: {}",
                path.display()
            )));
        }
    }

    let author = match request.author.as_deref() {
        None => AuthorChoice::IdentityDefault,
        Some("") => AuthorChoice::Explicit(None),
        Some(text) => {
            let sid = text
                .parse::<SubscriberId>()
                .map_err(|e| GwError::from(e).with_op("parse_author"))?;
            AuthorChoice::Explicit(Some(sid))
        }
    };

    if let Some(version) = request.version {
        manifest.get_or_insert_with(Manifest::file).set_version(version);
    }
    if let Some(date) = request.date_millis {
        manifest.get_or_insert_with(Manifest::file).set_date_millis(date);
    }
    if let Some(name) = &request.name {
        manifest
            .get_or_insert_with(Manifest::file)
            .set_name(name.clone())
            .map_err(|e| GwError::from(e).with_op("set_name"))?;
    }

    if let (AuthorChoice::Explicit(author), Some(m)) = (author, manifest.as_mut()) {
        m.set_author(author);
    }

    let manifest = manifest
        .map(|m| m.to_bytes())
        .transpose()
        .map_err(|e| GwError::from(e).with_op("encode_manifest"))?;

    Ok(PreparedInsert { manifest, author })
}

fn load_existing_manifest(path: &Path) -> Result<Manifest> {
    if !path.is_file() {
        return Err(invalid_input(format!(
            "Existing manifest file could not be read: {}",
            path.display()
        )));
    }
    let mut manifest =
        Manifest::read_from_path(path).map_err(|e| GwError::from(e).with_op("read_manifest"))?;
    manifest.clear_derived();
    Ok(manifest)
}

fn submit(
    gw: &Gateway,
    ctx: &RequestContext,
    request: &InsertRequest,
    prepared: PreparedInsert,
    options: Option<&AddOptions>,
) -> Result<ContentUri> {
    let author = match prepared.author {
        AuthorChoice::Explicit(author) => author,
        AuthorChoice::IdentityDefault => gw.identity().default_author()?,
    };

    let staged = prepared
        .manifest
        .as_deref()
        .map(|bytes| gw.staging().stage_manifest(ctx, bytes))
        .transpose()?;
    if let Some(file) = &staged {
        tracing::debug!(
            request_id = ctx.request_id.as_str(),
            staging_path = %file.path().display(),
            "Manifest staged"
        );
    }

    let added = gw.store().add_bundle(
        request.payload_path.as_deref(),
        staged.as_ref().map(|f| f.path()),
        author.as_ref(),
        options,
    );
    if let Some(file) = staged {
        discard_staged(file);
    }
    let added = added?;

    tracing::debug!(
        request_id = ctx.request_id.as_str(),
        bundle_id = %added.bundle_id,
        version = ?added.version,
        "Bundle added"
    );

    if let Some(dest) = &request.save_manifest_path {
        gw.store()
            .extract_manifest(&added.bundle_id, dest)
            .map_err(|e| e.with_bundle_id(added.bundle_id.to_hex()))?;
    }

    Ok(ContentUri::for_bundle(gw.authority(), &added.bundle_id))
}

/// Best-effort removal; a leftover staging manifest never fails the insert
fn discard_staged(file: NamedTempFile) {
    let path = file.path().to_path_buf();
    if let Err(e) = file.close() {
        tracing::warn!(
            staging_path = %path.display(),
            error = %e,
            "Failed to remove staged manifest"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_prepare_name_only_builds_file_manifest() {
        let request = InsertRequest {
            name: Some("notes.txt".to_string()),
            ..InsertRequest::default()
        };
        let prepared = prepare(&request).unwrap();
        let manifest = Manifest::from_bytes(prepared.manifest.as_deref().unwrap()).unwrap();

        assert!(manifest.is_file());
        assert_eq!(manifest.as_file().and_then(|f| f.name()), Some("notes.txt"));
        assert_eq!(prepared.author, AuthorChoice::IdentityDefault);
    }

    #[test]
    fn test_prepare_without_overrides_has_no_manifest() {
        let temp = TempDir::new().unwrap();
        let payload = temp.path().join("p.bin");
        fs::write(&payload, b"abc").unwrap();

        let request = InsertRequest {
            payload_path: Some(payload),
            ..InsertRequest::default()
        };
        let prepared = prepare(&request).unwrap();
        assert!(prepared.manifest.is_none());
    }

    #[test]
    fn test_prepare_empty_author_clears_manifest_author() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("m");
        let mut existing = Manifest::file();
        existing.set_author(Some(SubscriberId::from_bytes([4; 32])));
        fs::write(&path, existing.to_bytes().unwrap()).unwrap();

        let request = InsertRequest {
            manifest_path: Some(path),
            author: Some(String::new()),
            ..InsertRequest::default()
        };
        let prepared = prepare(&request).unwrap();
        let manifest = Manifest::from_bytes(prepared.manifest.as_deref().unwrap()).unwrap();

        assert_eq!(prepared.author, AuthorChoice::Explicit(None));
        assert_eq!(manifest.author(), None);
    }

    #[test]
    fn test_prepare_bad_author_is_invalid_input() {
        let request = InsertRequest {
            author: Some("not-hex".to_string()),
            ..InsertRequest::default()
        };
        let err = prepare(&request).unwrap_err();
        assert_eq!(err.kind(), GwErrorKind::InvalidInput);
    }

    #[test]
    fn test_keep_validation_kind_wraps_everything_else() {
        let io = GwError::new(GwErrorKind::Io).with_message("disk full");
        let wrapped = keep_validation_kind(io);
        assert_eq!(wrapped.kind(), GwErrorKind::OperationFailed);
        assert_eq!(wrapped.message(), "disk full");

        let invalid = GwError::new(GwErrorKind::InvalidInput);
        assert_eq!(
            keep_validation_kind(invalid).kind(),
            GwErrorKind::InvalidInput
        );
    }
}
