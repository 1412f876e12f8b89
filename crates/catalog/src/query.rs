//! Area-of-interest queries over stored footprints.
//!
//! Matches files whose footprint linestrings come within a given distance
//! of a query polygon. Distance is geodetic, computed by the storage
//! engine's geography type in meters and reported here in kilometers.

use sqlx::PgPool;
use tracing::{debug, info};

use catalog_common::geometry::Polygon;
use catalog_common::{CatalogError, CatalogResult};

use crate::entities::File;
use crate::schema::Schema;

const WITHIN_DISTANCE_SQL: &str = "SELECT f.uid, f.file_type_id, f.file_format_id, \
     f.is_archived, f.created_at FROM file f \
     WHERE f.uid IN (SELECT dlist.uid FROM \
     (SELECT uid, ST_Distance(data_value, ST_GeogFromText($1)) / 1000.0 AS dist \
     FROM parameter_linestring) dlist WHERE dlist.dist <= $2)";

const WITHIN_DISTANCE_BY_TYPE_SQL: &str = "SELECT f.uid, f.file_type_id, f.file_format_id, \
     f.is_archived, f.created_at FROM file f \
     JOIN file_type ft ON ft.file_type_id = f.file_type_id \
     WHERE ft.file_type_name = $3 \
     AND f.uid IN (SELECT dlist.uid FROM \
     (SELECT uid, ST_Distance(data_value, ST_GeogFromText($1)) / 1000.0 AS dist \
     FROM parameter_linestring) dlist WHERE dlist.dist <= $2)";

/// Read-only spatial query engine over the catalog's footprints.
///
/// Runs directly against the pool; it never participates in a
/// [`crate::CatalogManager`] unit of work and only sees committed data.
pub struct QueryEngine {
    pool: PgPool,
    schema: Schema,
}

impl QueryEngine {
    pub fn new(pool: PgPool, schema: &Schema) -> Self {
        Self {
            pool,
            schema: schema.clone(),
        }
    }

    /// Files with at least one footprint within `distance_km` of the region
    /// polygon's boundary, `distance_km = 0.0` meaning intersecting or
    /// touching it. `file_type_name` restricts results to one file type.
    ///
    /// The region is an open ring of lon/lat vertices; closure is implied.
    pub async fn find_within_distance(
        &self,
        region: &[(f64, f64)],
        file_type_name: Option<&str>,
        distance_km: f64,
    ) -> CatalogResult<Vec<File>> {
        if !distance_km.is_finite() || distance_km < 0.0 {
            return Err(CatalogError::Validation(format!(
                "distance must be a finite non-negative number of km, got {}",
                distance_km
            )));
        }

        let polygon = Polygon::new(region)?;
        let ewkt = format!("SRID={};{}", self.schema.srid(), polygon.to_wkt());
        debug!(%ewkt, distance_km, file_type = ?file_type_name, "area-of-interest query");

        let rows = match file_type_name {
            None => {
                sqlx::query_as::<_, File>(WITHIN_DISTANCE_SQL)
                    .bind(&ewkt)
                    .bind(distance_km)
                    .fetch_all(&self.pool)
                    .await
            }
            Some(name) => {
                sqlx::query_as::<_, File>(WITHIN_DISTANCE_BY_TYPE_SQL)
                    .bind(&ewkt)
                    .bind(distance_km)
                    .bind(name)
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(|e| CatalogError::Storage(format!("Query failed: {}", e)))?;

        info!(matches = rows.len(), distance_km, "area-of-interest query done");
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_uses_bound_parameters() {
        assert!(WITHIN_DISTANCE_SQL.contains("ST_GeogFromText($1)"));
        assert!(WITHIN_DISTANCE_SQL.contains("dlist.dist <= $2"));
        assert!(WITHIN_DISTANCE_BY_TYPE_SQL.contains("ft.file_type_name = $3"));
    }

    #[test]
    fn test_sql_converts_meters_to_km() {
        assert!(WITHIN_DISTANCE_SQL.contains("/ 1000.0"));
        assert!(WITHIN_DISTANCE_BY_TYPE_SQL.contains("/ 1000.0"));
    }

    #[tokio::test]
    async fn test_rejects_negative_distance() {
        let engine = stub_engine();
        let region = [(9.0, 49.0), (13.0, 49.0), (13.0, 53.0), (9.0, 53.0)];
        let err = engine
            .find_within_distance(&region, None, -1.0)
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));
    }

    #[tokio::test]
    async fn test_rejects_non_finite_distance() {
        let engine = stub_engine();
        let region = [(9.0, 49.0), (13.0, 49.0), (13.0, 53.0), (9.0, 53.0)];
        let err = engine
            .find_within_distance(&region, None, f64::NAN)
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));
    }

    #[tokio::test]
    async fn test_rejects_degenerate_region() {
        let engine = stub_engine();
        let err = engine
            .find_within_distance(&[(9.0, 49.0), (13.0, 49.0)], None, 0.0)
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));
    }

    // Validation happens before any connection is used, so a lazy pool
    // pointed at an unreachable host is fine here.
    fn stub_engine() -> QueryEngine {
        let pool = PgPool::connect_lazy("postgresql://localhost:1/unused")
            .expect("lazy pool");
        QueryEngine::new(pool, &Schema::new())
    }
}
