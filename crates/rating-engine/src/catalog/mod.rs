//! Catalog module
//!
//! Provides the versioned pricing catalog:
//! - CatalogDocument: wire shape of a version, validated on arrival
//! - RatingCatalog: in-memory store of versions, rejected ones included
//! - select_version: ceiling search over version timestamps

pub mod document;
pub mod selector;
pub mod store;

pub use document::{parse_timestamp, CatalogDocument};
pub use selector::{select_version, select_version_by};
pub use store::{CatalogEntry, CatalogSnapshot, RatingCatalog};
