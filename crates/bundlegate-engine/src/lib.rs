//! bundlegate engine - gateway orchestration
//!
//! Coordinates the domain model with the store client: validates requests,
//! stages files for the store in a request-scoped way, and collapses every
//! failure into the gateway error taxonomy.

pub mod commands;
pub mod config;
pub mod gateway;
pub mod handle;
pub mod staging;

pub use config::{build_gateway, GatewayConfig, StoreConfig};
pub use gateway::{Gateway, Selection, DEFAULT_AUTHORITY};
pub use handle::PayloadHandle;
pub use staging::StagingArea;
