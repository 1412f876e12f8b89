//! Explicit schema definition for the catalog.
//!
//! One [`Schema`] value is constructed at startup and passed by reference
//! into [`crate::CatalogManager`] and [`crate::QueryEngine`]; there is no
//! ambient global registry of tables.

use catalog_common::{CatalogError, CatalogResult};

/// Default spatial reference system: WGS 84 geodetic lon/lat.
pub const DEFAULT_SRID: i32 = 4326;

/// Valid srid range enforced by the `spatial_ref_sys` lookup table.
const SRID_MAX: i32 = 998_999;

/// Schema definition: table DDL and the spatial reference system used for
/// geometry columns.
#[derive(Debug, Clone)]
pub struct Schema {
    srid: i32,
}

impl Schema {
    /// Schema in the default reference system (WGS 84).
    pub fn new() -> Self {
        Self { srid: DEFAULT_SRID }
    }

    /// Schema with an explicit srid, which must lie in (0, 998999].
    pub fn with_srid(srid: i32) -> CatalogResult<Self> {
        if srid <= 0 || srid > SRID_MAX {
            return Err(CatalogError::Validation(format!(
                "srid {} is out of range (0, {}]",
                srid, SRID_MAX
            )));
        }
        Ok(Self { srid })
    }

    pub fn srid(&self) -> i32 {
        self.srid
    }

    /// The catalog DDL, executable statement by statement.
    ///
    /// `spatial_ref_sys` is not created here: PostGIS ships it as a
    /// read-only lookup table.
    pub fn ddl(&self) -> String {
        format!(
            r#"
CREATE EXTENSION IF NOT EXISTS postgis;

CREATE TABLE IF NOT EXISTS file_type (
    file_type_id INTEGER PRIMARY KEY,
    file_type_name VARCHAR(100) NOT NULL,
    description TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS file_format (
    file_format_id INTEGER PRIMARY KEY,
    file_format_name VARCHAR(100) NOT NULL,
    description TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS parameter_type (
    parameter_type_id INTEGER PRIMARY KEY,
    parameter_type_name VARCHAR(100) NOT NULL,
    parameter_location VARCHAR(200) NOT NULL
);

CREATE TABLE IF NOT EXISTS parameter (
    parameter_id INTEGER PRIMARY KEY,
    parameter_type_id INTEGER NOT NULL REFERENCES parameter_type(parameter_type_id),
    parameter_name VARCHAR(100) NOT NULL,
    description TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tag (
    tag_id INTEGER PRIMARY KEY,
    tag VARCHAR(100) NOT NULL
);

CREATE TABLE IF NOT EXISTS boundary (
    boundary_id INTEGER PRIMARY KEY,
    boundary_name VARCHAR(100) NOT NULL,
    boundary GEOMETRY(POLYGON, {srid}) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS file (
    uid VARCHAR(200) PRIMARY KEY,
    file_type_id INTEGER NOT NULL REFERENCES file_type(file_type_id),
    file_format_id INTEGER NOT NULL REFERENCES file_format(file_format_id),
    is_archived BOOLEAN NOT NULL DEFAULT FALSE,
    created_at TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS file_uri (
    uid VARCHAR(200) NOT NULL REFERENCES file(uid) ON DELETE CASCADE,
    uri TEXT NOT NULL,
    PRIMARY KEY (uid, uri)
);

CREATE TABLE IF NOT EXISTS file_access_uri (
    file_type_id INTEGER NOT NULL REFERENCES file_type(file_type_id),
    file_format_id INTEGER NOT NULL REFERENCES file_format(file_format_id),
    sequence INTEGER NOT NULL,
    uri TEXT NOT NULL,
    PRIMARY KEY (file_type_id, file_format_id, sequence, uri)
);

CREATE TABLE IF NOT EXISTS parameter_value (
    uid VARCHAR(200) NOT NULL REFERENCES file(uid) ON DELETE CASCADE,
    parameter_id INTEGER NOT NULL REFERENCES parameter(parameter_id),
    data_value TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL,
    PRIMARY KEY (uid, parameter_id)
);

CREATE TABLE IF NOT EXISTS parameter_linestring (
    uid VARCHAR(200) NOT NULL REFERENCES file(uid) ON DELETE CASCADE,
    parameter_id INTEGER NOT NULL REFERENCES parameter(parameter_id),
    data_value GEOGRAPHY(LINESTRING, {srid}) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL,
    PRIMARY KEY (uid, parameter_id)
);

CREATE TABLE IF NOT EXISTS file_tag (
    uid VARCHAR(200) NOT NULL REFERENCES file(uid) ON DELETE CASCADE,
    tag_id INTEGER NOT NULL REFERENCES tag(tag_id),
    PRIMARY KEY (uid, tag_id)
);

CREATE TABLE IF NOT EXISTS file_type_tag (
    file_type_id INTEGER NOT NULL REFERENCES file_type(file_type_id),
    tag_id INTEGER NOT NULL REFERENCES tag(tag_id),
    PRIMARY KEY (file_type_id, tag_id)
);

CREATE TABLE IF NOT EXISTS file_type_parameter (
    file_type_id INTEGER NOT NULL REFERENCES file_type(file_type_id),
    parameter_id INTEGER NOT NULL REFERENCES parameter(parameter_id),
    PRIMARY KEY (file_type_id, parameter_id)
);

CREATE TABLE IF NOT EXISTS data_boundary (
    uid VARCHAR(200) NOT NULL REFERENCES file(uid) ON DELETE CASCADE,
    boundary_id INTEGER NOT NULL REFERENCES boundary(boundary_id),
    PRIMARY KEY (uid, boundary_id)
);

CREATE INDEX IF NOT EXISTS idx_file_created_at ON file(created_at);
CREATE INDEX IF NOT EXISTS idx_file_file_type ON file(file_type_id);
CREATE INDEX IF NOT EXISTS idx_parameter_linestring_geog ON parameter_linestring USING GIST(data_value);
CREATE INDEX IF NOT EXISTS idx_boundary_geom ON boundary USING GIST(boundary)
"#,
            srid = self.srid
        )
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_srid() {
        assert_eq!(Schema::new().srid(), 4326);
    }

    #[test]
    fn test_with_srid_in_range() {
        assert_eq!(Schema::with_srid(3857).unwrap().srid(), 3857);
    }

    #[test]
    fn test_with_srid_rejects_zero_and_negative() {
        assert!(Schema::with_srid(0).is_err());
        assert!(Schema::with_srid(-1).is_err());
    }

    #[test]
    fn test_with_srid_rejects_too_large() {
        assert!(Schema::with_srid(999_000).is_err());
        assert!(Schema::with_srid(998_999).is_ok());
    }

    #[test]
    fn test_ddl_interpolates_srid() {
        let ddl = Schema::new().ddl();
        assert!(ddl.contains("GEOGRAPHY(LINESTRING, 4326)"));
        assert!(ddl.contains("GEOMETRY(POLYGON, 4326)"));
    }

    #[test]
    fn test_ddl_cascades_from_file() {
        let ddl = Schema::new().ddl();
        for table in [
            "file_uri",
            "parameter_value",
            "parameter_linestring",
            "file_tag",
            "data_boundary",
        ] {
            let create = ddl
                .split("CREATE TABLE IF NOT EXISTS ")
                .find(|s| s.starts_with(table))
                .unwrap_or_else(|| panic!("missing table {}", table));
            assert!(
                create.contains("ON DELETE CASCADE"),
                "{} should cascade from file",
                table
            );
        }
    }

    #[test]
    fn test_ddl_does_not_create_spatial_ref_sys() {
        let ddl = Schema::new().ddl();
        assert!(!ddl.contains("CREATE TABLE IF NOT EXISTS spatial_ref_sys"));
    }
}
