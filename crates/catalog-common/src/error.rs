//! Error types for the sat-catalog workspace.

use thiserror::Error;

use crate::geometry::GeometryError;

/// Result type alias using CatalogError.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Primary error type for catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A required related entity (file type, file format, parameter, file)
    /// could not be resolved from the supplied reference. Raised before any
    /// staging occurs, so the unit of work is left unmodified.
    #[error("Unresolved reference: {0}")]
    Reference(String),

    /// A unique lookup matched zero or more than one row.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed geometry or invalid numeric input.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// The underlying storage engine failed. Staged-but-uncommitted changes
    /// from the failed unit of work are lost and must be restaged.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<GeometryError> for CatalogError {
    fn from(err: GeometryError) -> Self {
        CatalogError::Validation(err.to_string())
    }
}
