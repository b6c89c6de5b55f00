//! Gateway operation handlers with boundary logging.
//!
//! ## Logging Ownership
//!
//! Each handler owns lifecycle logging for its operation:
//! - `log_op_start!` at entry
//! - `log_op_end!` on success
//! - `log_op_error!` on failure
//!
//! Lower layers (store, staging) use only `tracing::debug!()` and
//! `tracing::warn!()` for internal details.

pub mod insert;
pub mod open;
pub mod query;
pub mod unsupported;

use bundlegate_core::GwError;
use bundlegate_core_types::RequestContext;

/// Stamp an error leaving the gateway with its operation and request
pub(crate) fn at_boundary(err: GwError, op: &str, ctx: &RequestContext) -> GwError {
    let err = if err.op().is_none() { err.with_op(op) } else { err };
    err.with_request_id(ctx.request_id.clone())
}
