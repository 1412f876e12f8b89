//! The catalog's entity model.
//!
//! Plain structs mirroring the relational schema. Geometry-bearing entities
//! ([`Boundary`], [`ParameterLinestring`]) hold parsed geometry values and
//! are loaded through internal WKT row types in the manager. All
//! identifiers are caller-assigned.

use catalog_common::geometry::{LineString, Polygon};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Classification of a file's content category (e.g. "swath", "granule").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct FileType {
    pub file_type_id: i32,
    pub file_type_name: String,
    pub description: String,
}

/// Physical encoding of a file (e.g. "hdf5", "netcdf4").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct FileFormat {
    pub file_format_id: i32,
    pub file_format_name: String,
    pub description: String,
}

/// Classification of a measured quantity, e.g. an instrument channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ParameterType {
    pub parameter_type_id: i32,
    pub parameter_type_name: String,
    pub parameter_location: String,
}

/// A specific measured quantity, belonging to exactly one [`ParameterType`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Parameter {
    pub parameter_id: i32,
    pub parameter_type_id: i32,
    pub parameter_name: String,
    pub description: String,
}

/// Free-form label, associable with files and file types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Tag {
    pub tag_id: i32,
    pub tag: String,
}

/// A named reusable area of interest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Boundary {
    pub boundary_id: i32,
    pub boundary_name: String,
    pub boundary: Polygon,
    pub created_at: DateTime<Utc>,
}

/// The central entity: a cataloged data file.
///
/// Deleting a file cascades to its parameter values, footprints, URIs, tag
/// links and boundary links, but never to the referenced definitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct File {
    pub uid: String,
    pub file_type_id: i32,
    pub file_format_id: i32,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
}

/// A storage location for a file; a file may have several.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct FileUri {
    pub uid: String,
    pub uri: String,
}

/// Templated access-URI pattern keyed by type/format combination,
/// independent of any single file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct FileAccessUri {
    pub file_type_id: i32,
    pub file_format_id: i32,
    pub sequence: i32,
    pub uri: String,
}

/// A scalar observation of a parameter for a file. At most one per
/// (uid, parameter_id) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ParameterValue {
    pub uid: String,
    pub parameter_id: i32,
    pub data_value: String,
    pub created_at: DateTime<Utc>,
}

/// The spatial footprint of a parameter's observation for a file. This is
/// what area-of-interest queries match against. At most one per
/// (uid, parameter_id) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterLinestring {
    pub uid: String,
    pub parameter_id: i32,
    pub data_value: LineString,
    pub created_at: DateTime<Utc>,
}

/// Reference-system metadata. Read-only lookup into the PostGIS
/// `spatial_ref_sys` table; srid is constrained to (0, 998999].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct SpatialRefSys {
    pub srid: i32,
    pub auth_name: Option<String>,
    pub auth_srid: Option<i32>,
    pub srtext: Option<String>,
    pub proj4text: Option<String>,
}

// Join entities. Many-to-many relations are modeled as first-class rows
// with explicit insert/delete, not as ORM-style managed relationships.

/// Association between a file and a tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct FileTagLink {
    pub uid: String,
    pub tag_id: i32,
}

/// Association between a file and a boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct FileBoundaryLink {
    pub uid: String,
    pub boundary_id: i32,
}

/// Association between a file type and a tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct FileTypeTagLink {
    pub file_type_id: i32,
    pub tag_id: i32,
}

/// Declares that a file type may carry a parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct FileTypeParameterLink {
    pub file_type_id: i32,
    pub parameter_id: i32,
}

/// Tagged union over all deletable catalog entities, consumed by
/// [`crate::CatalogManager::delete`].
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    FileType(FileType),
    FileFormat(FileFormat),
    ParameterType(ParameterType),
    Parameter(Parameter),
    Tag(Tag),
    Boundary(Boundary),
    File(File),
    FileUri(FileUri),
    FileAccessUri(FileAccessUri),
    ParameterValue(ParameterValue),
    ParameterLinestring(ParameterLinestring),
    FileTagLink(FileTagLink),
    FileBoundaryLink(FileBoundaryLink),
    FileTypeTagLink(FileTypeTagLink),
    FileTypeParameterLink(FileTypeParameterLink),
}

macro_rules! entity_from {
    ($($kind:ident),+ $(,)?) => {
        $(
            impl From<$kind> for Entity {
                fn from(value: $kind) -> Self {
                    Entity::$kind(value)
                }
            }
        )+
    };
}

entity_from!(
    FileType,
    FileFormat,
    ParameterType,
    Parameter,
    Tag,
    Boundary,
    File,
    FileUri,
    FileAccessUri,
    ParameterValue,
    ParameterLinestring,
    FileTagLink,
    FileBoundaryLink,
    FileTypeTagLink,
    FileTypeParameterLink,
);
