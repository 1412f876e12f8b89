//! Spatial metadata catalog for geophysical and satellite data files.
//!
//! Records which files exist, their type and format, the parameters they
//! carry, where they live (URIs), and the geographic area they cover.
//! Backed by PostgreSQL with PostGIS for the geodetic footprint columns.
//!
//! - [`entities`] - the catalog's entity model
//! - [`schema`] - explicit schema definition (DDL, SRID)
//! - [`manager`] - create/read/delete operations over one unit of work
//! - [`query`] - the area-of-interest query engine

pub mod config;
pub mod entities;
pub mod manager;
pub mod query;
pub mod refs;
pub mod schema;

pub use config::CatalogConfig;
pub use entities::{
    Boundary, Entity, File, FileAccessUri, FileBoundaryLink, FileFormat, FileTagLink, FileType,
    FileTypeParameterLink, FileTypeTagLink, FileUri, Parameter, ParameterLinestring,
    ParameterType, ParameterValue, SpatialRefSys, Tag,
};
pub use manager::CatalogManager;
pub use query::QueryEngine;
pub use refs::{EntityRef, FileRef};
pub use schema::Schema;
