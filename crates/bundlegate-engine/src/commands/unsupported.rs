//! Operations the gateway refuses
//!
//! Bundles are append-only from the caller's point of view; these fail
//! without touching the store or the staging area.

use super::at_boundary;
use crate::gateway::Selection;
use bundlegate_core::core_types::schema::{OP_DELETE, OP_GET_TYPE, OP_UPDATE};
use bundlegate_core::errors::unsupported;
use bundlegate_core::{log_op_error, log_op_start};
use bundlegate_core::{ContentUri, ContentValues, Result};
use bundlegate_core_types::RequestContext;

fn refuse<T>(op: &'static str, ctx: &RequestContext, uri: &ContentUri) -> Result<T> {
    log_op_start!(op, request_id = ctx.request_id.as_str(), uri = %uri);
    let err = at_boundary(unsupported(op), op, ctx);
    log_op_error!(
        op,
        &err,
        duration_ms = ctx.elapsed_ms(),
        request_id = ctx.request_id.as_str()
    );
    Err(err)
}

pub fn delete(ctx: &RequestContext, uri: &ContentUri, _selection: &Selection) -> Result<usize> {
    refuse(OP_DELETE, ctx, uri)
}

pub fn update(
    ctx: &RequestContext,
    uri: &ContentUri,
    _values: &ContentValues,
    _selection: &Selection,
) -> Result<usize> {
    refuse(OP_UPDATE, ctx, uri)
}

pub fn get_type(ctx: &RequestContext, uri: &ContentUri) -> Result<String> {
    refuse(OP_GET_TYPE, ctx, uri)
}
