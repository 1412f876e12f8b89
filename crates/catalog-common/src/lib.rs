//! Common types shared across the sat-catalog workspace.

pub mod error;
pub mod geometry;

pub use error::{CatalogError, CatalogResult};
pub use geometry::{GeometryError, LineString, Polygon};
