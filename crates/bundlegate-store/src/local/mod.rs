//! Filesystem bundle store
//!
//! Provides:
//! - Content-addressable payload storage with atomic writes
//! - Collision detection
//! - Sharding by the first 2 hex chars of the digest
//! - One manifest file per bundle, versioned monotonically

mod atomic;
mod cas;
mod sharding;
mod store;

pub use cas::PayloadCas;
pub use store::LocalStore;
