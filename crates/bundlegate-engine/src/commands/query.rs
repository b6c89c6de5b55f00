//! Listing pass-through
//!
//! The store decides what a listing contains; the gateway only checks the
//! request shape and forwards `selection_args` as positional parameters.

use super::at_boundary;
use crate::gateway::{Gateway, Selection};
use bundlegate_core::core_types::schema::OP_QUERY;
use bundlegate_core::{log_op_end, log_op_error, log_op_start};
use bundlegate_core::{BundleTable, ContentUri, GwError, GwErrorKind, Result};
use bundlegate_core_types::RequestContext;

pub fn query(
    gw: &Gateway,
    ctx: &RequestContext,
    uri: &ContentUri,
    selection: &Selection,
) -> Result<BundleTable> {
    log_op_start!(OP_QUERY, request_id = ctx.request_id.as_str(), uri = %uri);

    let table = query_impl(gw, uri, selection).map_err(|e| {
        let e = at_boundary(e, OP_QUERY, ctx);
        log_op_error!(
            OP_QUERY,
            &e,
            duration_ms = ctx.elapsed_ms(),
            request_id = ctx.request_id.as_str()
        );
        e
    })?;

    log_op_end!(
        OP_QUERY,
        duration_ms = ctx.elapsed_ms(),
        request_id = ctx.request_id.as_str(),
        rows = table.len()
    );
    Ok(table)
}

fn query_impl(gw: &Gateway, uri: &ContentUri, selection: &Selection) -> Result<BundleTable> {
    check_shape(uri, selection)?;

    if let Some(order) = &selection.sort_order {
        tracing::debug!(sort_order = %order, "Sort order ignored; rows come in store order");
    }

    let args = selection.selection_args.as_deref().unwrap_or(&[]);
    gw.store()
        .list_bundles(args)
        .map_err(|e| GwError::wrap(GwErrorKind::InvalidInput, e))
}

fn check_shape(uri: &ContentUri, selection: &Selection) -> Result<()> {
    let unsupported = |message: &str| {
        GwError::new(GwErrorKind::UnsupportedOperation)
            .with_op(OP_QUERY)
            .with_message(message.to_string())
    };
    if uri.path() != "/" {
        return Err(unsupported("Only the root URI can be queried"));
    }
    if selection.projection.is_some() {
        return Err(unsupported("Projection is not supported"));
    }
    if selection.selection.is_some() {
        return Err(unsupported("Selection is not supported"));
    }
    Ok(())
}
