//! Gateway domain model

pub mod ids;
pub mod manifest;
pub mod request;
pub mod table;
pub mod uri;

pub use ids::{BundleId, IdParseError, SubscriberId};
pub use manifest::{FileFields, Manifest, ManifestError, ManifestKind};
pub use request::{ContentValues, InsertRequest};
pub use table::BundleTable;
pub use uri::ContentUri;
