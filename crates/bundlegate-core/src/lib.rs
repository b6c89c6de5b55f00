//! bundlegate core - shared model and facilities
//!
//! This crate provides:
//! - The canonical error facility (`GwError`, `GwErrorKind`)
//! - The structured logging facility and its macros
//! - The bundle model: identifiers, manifest variants and their text codec,
//!   insert requests, listing tables and `content://` URIs

pub mod errors;
pub mod logging_facility;
pub mod model;

pub use bundlegate_core_types as core_types;

pub use errors::{GwError, GwErrorKind, Result};
pub use model::{
    BundleId, BundleTable, ContentUri, ContentValues, InsertRequest, Manifest, ManifestKind,
    SubscriberId,
};
