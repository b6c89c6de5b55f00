//! bundlegate store - clients for the external bundle store
//!
//! Provides:
//! - The `BundleStore` / `IdentitySource` traits the gateway consumes
//! - `ServaldClient`, which drives the store daemon out of process and
//!   validates everything it prints
//! - `LocalStore`, a filesystem content-addressed store with the same
//!   contract, used offline and in tests

pub mod client;
pub mod errors;
pub mod local;
pub mod servald;

pub use client::{AddBundleResult, AddOptions, BundleStore, IdentitySource, StaticIdentity};
pub use errors::Result;
pub use local::LocalStore;
pub use servald::ServaldClient;
