//! Error handling for bundlegate-store
//!
//! Wraps bundlegate-core GwError with store-specific helpers

use bundlegate_core::errors::{GwError, GwErrorKind};
use bundlegate_core::BundleId;

pub use bundlegate_core::errors::io_error;

/// Result type alias using GwError
pub type Result<T> = std::result::Result<T, GwError>;

/// The store refused or failed an operation
pub fn store_failure(op: &str, reason: impl Into<String>) -> GwError {
    GwError::new(GwErrorKind::ExternalService)
        .with_op(op.to_string())
        .with_message(reason.into())
}

/// The store process printed something we cannot trust
pub fn malformed_output(op: &str, reason: impl Into<String>) -> GwError {
    GwError::new(GwErrorKind::ExternalService)
        .with_op(op.to_string())
        .with_message(format!("malformed store output: {}", reason.into()))
}

/// Listing arguments the store cannot interpret
pub fn bad_list_args(reason: impl Into<String>) -> GwError {
    GwError::new(GwErrorKind::InvalidInput)
        .with_op("list_bundles")
        .with_message(reason.into())
}

/// No bundle with this id
pub fn bundle_missing(op: &str, id: &BundleId) -> GwError {
    GwError::new(GwErrorKind::NotFound)
        .with_op(op.to_string())
        .with_bundle_id(id.to_hex())
        .with_message(format!("bundle {} not found", id))
}

/// Content-addressed blob collision
pub fn cas_collision(digest: &str) -> GwError {
    GwError::new(GwErrorKind::ExternalService)
        .with_op("cas_write")
        .with_message(format!("CAS collision for digest {}", digest))
}

/// Content-addressed blob missing
pub fn cas_missing(digest: &str) -> GwError {
    GwError::new(GwErrorKind::NotFound)
        .with_op("cas_read")
        .with_message(format!("CAS blob not found for digest {}", digest))
}
