//! Extraction pipeline
//!
//! Write intent is refused before anything else. After that every failure
//! is `NotFound` with the underlying error as its cause, and the staging
//! guard removes the extraction file on every path.

use super::at_boundary;
use crate::gateway::Gateway;
use crate::handle::PayloadHandle;
use bundlegate_core::core_types::schema::OP_OPEN;
use bundlegate_core::{log_op_end, log_op_error, log_op_start};
use bundlegate_core::{BundleId, ContentUri, GwError, GwErrorKind, Result};
use bundlegate_core_types::RequestContext;

/// Whether an access mode string asks for anything beyond reading
pub fn is_write_mode(mode: &str) -> bool {
    mode.contains(['w', 'a', '+'])
}

pub fn open(gw: &Gateway, ctx: &RequestContext, uri: &ContentUri, mode: &str) -> Result<PayloadHandle> {
    log_op_start!(
        OP_OPEN,
        request_id = ctx.request_id.as_str(),
        uri = %uri,
        mode = mode
    );

    let handle = open_impl(gw, ctx, uri, mode).map_err(|e| {
        let e = at_boundary(e, OP_OPEN, ctx);
        log_op_error!(
            OP_OPEN,
            &e,
            duration_ms = ctx.elapsed_ms(),
            request_id = ctx.request_id.as_str()
        );
        e
    })?;

    log_op_end!(
        OP_OPEN,
        duration_ms = ctx.elapsed_ms(),
        request_id = ctx.request_id.as_str(),
        bytes = handle.len()
    );
    Ok(handle)
}

fn open_impl(gw: &Gateway, ctx: &RequestContext, uri: &ContentUri, mode: &str) -> Result<PayloadHandle> {
    if is_write_mode(mode) {
        return Err(GwError::new(GwErrorKind::PermissionDenied)
            .with_op(OP_OPEN)
            .with_message(format!("Write operations are not allowed (mode '{}')", mode)));
    }
    extract(gw, ctx, uri).map_err(|e| match e.kind() {
        GwErrorKind::NotFound => e,
        _ => GwError::wrap(GwErrorKind::NotFound, e),
    })
}

fn bundle_id_of(uri: &ContentUri) -> Result<BundleId> {
    let segments = uri.path_segments();
    let first = segments.first().ok_or_else(|| {
        GwError::new(GwErrorKind::NotFound)
            .with_op(OP_OPEN)
            .with_message(format!("URI names no bundle: {}", uri))
    })?;
    first.parse::<BundleId>().map_err(|e| {
        GwError::new(GwErrorKind::NotFound)
            .with_op(OP_OPEN)
            .with_message(format!("Invalid bundle id '{}'", first))
            .with_source(GwError::from(e))
    })
}

fn extract(gw: &Gateway, ctx: &RequestContext, uri: &ContentUri) -> Result<PayloadHandle> {
    let id = bundle_id_of(uri)?;
    let staged = gw.staging().payload_path(ctx, &id)?;

    tracing::debug!(
        request_id = ctx.request_id.as_str(),
        bundle_id = %id,
        staging_path = %staged.path().display(),
        "Extracting payload"
    );

    gw.store()
        .extract_payload(&id, staged.path())
        .map_err(|e| e.with_bundle_id(id.to_hex()))?;
    PayloadHandle::from_staged(staged).map_err(|e| e.with_bundle_id(id.to_hex()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_modes() {
        for mode in ["w", "rw", "wt", "wa", "rwt", "a", "r+"] {
            assert!(is_write_mode(mode), "{} should be write", mode);
        }
        for mode in ["r", "", "rt"] {
            assert!(!is_write_mode(mode), "{} should be read-only", mode);
        }
    }

    #[test]
    fn test_bundle_id_of_accepts_lowercase() {
        let hex = "ab".repeat(32);
        let uri = ContentUri::new("auth", format!("/{}", hex));
        assert_eq!(bundle_id_of(&uri).unwrap().to_hex(), hex.to_uppercase());
    }

    #[test]
    fn test_bundle_id_of_errors_are_not_found() {
        for path in ["/", "/xyz", "/ABCD"] {
            let err = bundle_id_of(&ContentUri::new("auth", path)).unwrap_err();
            assert_eq!(err.kind(), GwErrorKind::NotFound, "path {}", path);
        }
    }
}
