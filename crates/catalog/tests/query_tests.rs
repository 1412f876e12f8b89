//! Integration tests for area-of-interest queries.
//!
//! These need a PostGIS-enabled Postgres pointed to by DATABASE_URL and
//! skip themselves otherwise.

use catalog::{CatalogConfig, CatalogManager, Entity, QueryEngine, Schema};
use catalog_common::geometry::LineString;
use test_utils::{fixtures, require_database};

async fn manager(url: &str) -> CatalogManager {
    let schema = Schema::new();
    let mgr = CatalogManager::connect(&CatalogConfig::new(url), &schema)
        .await
        .expect("connect");
    mgr.migrate().await.expect("migrate");
    mgr
}

/// Seed one file of the given type with one footprint linestring. Ids for
/// the parameter stack are derived from `base_id`.
async fn seed_file(
    mgr: &mut CatalogManager,
    base_id: i32,
    type_name: &str,
    uid: &str,
    track: &LineString,
) {
    mgr.create_file_type(base_id, type_name, "polar swath")
        .await
        .expect("file_type");
    mgr.create_file_format(base_id, &format!("{}-hdf5", type_name), "HDF5")
        .await
        .expect("file_format");
    mgr.create_parameter_type(base_id, &format!("{}-channel", type_name), "instrument")
        .await
        .expect("parameter_type");
    mgr.create_parameter(base_id, base_id, &format!("{}-track", type_name), "scan track")
        .await
        .expect("parameter");
    mgr.create_file(uid, base_id, base_id, false, None)
        .await
        .expect("file");
    mgr.create_parameter_linestring(track, uid, base_id, None)
        .await
        .expect("linestring");
}

/// Remove everything [`seed_file`] created.
async fn unseed_file(mgr: &mut CatalogManager, base_id: i32, type_name: &str, uid: &str) {
    let file = mgr.get_file(uid).await.expect("cleanup file");
    mgr.delete(&Entity::File(file)).await.expect("cleanup");
    let p = mgr
        .get_parameter(&format!("{}-track", type_name))
        .await
        .expect("cleanup parameter");
    mgr.delete(&Entity::Parameter(p)).await.expect("cleanup");
    mgr.delete(&Entity::ParameterType(catalog::ParameterType {
        parameter_type_id: base_id,
        parameter_type_name: String::new(),
        parameter_location: String::new(),
    }))
    .await
    .expect("cleanup");
    let ft = mgr.get_file_type(type_name).await.expect("cleanup");
    mgr.delete(&Entity::FileType(ft)).await.expect("cleanup");
    let ff = mgr
        .get_file_format(&format!("{}-hdf5", type_name))
        .await
        .expect("cleanup");
    mgr.delete(&Entity::FileFormat(ff)).await.expect("cleanup");
}

fn uids(files: &[catalog::File]) -> Vec<&str> {
    files.iter().map(|f| f.uid.as_str()).collect()
}

// ============================================================
// Zero-distance (intersection) matching
// ============================================================

#[tokio::test]
async fn test_zero_distance_matches_track_inside_region() {
    let url = require_database!();
    let mut mgr = manager(&url).await;
    seed_file(&mut mgr, 2101, "q-inside", "Q-F101", &fixtures::scan_track()).await;
    seed_file(&mut mgr, 2102, "q-far", "Q-F102", &fixtures::atlantic_track()).await;
    mgr.save().await.expect("save");

    let engine = QueryEngine::new(mgr.pool().clone(), &Schema::new());
    let found = engine
        .find_within_distance(&fixtures::swath_region_vertices(), None, 0.0)
        .await
        .expect("query");

    let found = uids(&found);
    assert!(found.contains(&"Q-F101"));
    assert!(!found.contains(&"Q-F102"));

    unseed_file(&mut mgr, 2101, "q-inside", "Q-F101").await;
    unseed_file(&mut mgr, 2102, "q-far", "Q-F102").await;
    mgr.save().await.expect("cleanup save");
}

// ============================================================
// Distance thresholds
// ============================================================

#[tokio::test]
async fn test_distance_threshold_includes_and_excludes() {
    let url = require_database!();
    let mut mgr = manager(&url).await;
    // The track's northern end at (12E, 52N) sits about 390 km from the
    // region's southern edge: the edge between (1.7, 54.8) and (28.7, 54.9)
    // bulges poleward along the geodesic, so the gap is wider than the
    // plain latitude difference suggests.
    seed_file(&mut mgr, 2201, "q-near", "Q-F201", &fixtures::scan_track()).await;
    mgr.save().await.expect("save");

    let engine = QueryEngine::new(mgr.pool().clone(), &Schema::new());
    let region = fixtures::nordic_region_vertices();

    let near = engine
        .find_within_distance(&region, None, 350.0)
        .await
        .expect("query 350km");
    assert!(!uids(&near).contains(&"Q-F201"));

    let wide = engine
        .find_within_distance(&region, None, 430.0)
        .await
        .expect("query 430km");
    assert!(uids(&wide).contains(&"Q-F201"));

    unseed_file(&mut mgr, 2201, "q-near", "Q-F201").await;
    mgr.save().await.expect("cleanup save");
}

// ============================================================
// File-type filtering
// ============================================================

#[tokio::test]
async fn test_file_type_filter_restricts_results() {
    let url = require_database!();
    let mut mgr = manager(&url).await;
    // Two files with identical footprints but different types.
    seed_file(&mut mgr, 2301, "q-swath-a", "Q-F301", &fixtures::scan_track()).await;
    seed_file(&mut mgr, 2302, "q-swath-b", "Q-F302", &fixtures::scan_track()).await;
    mgr.save().await.expect("save");

    let engine = QueryEngine::new(mgr.pool().clone(), &Schema::new());
    let region = fixtures::swath_region_vertices();

    let filtered = engine
        .find_within_distance(&region, Some("q-swath-a"), 0.0)
        .await
        .expect("filtered query");
    let filtered = uids(&filtered);
    assert!(filtered.contains(&"Q-F301"));
    assert!(!filtered.contains(&"Q-F302"));

    let unfiltered = engine
        .find_within_distance(&region, None, 0.0)
        .await
        .expect("unfiltered query");
    let unfiltered = uids(&unfiltered);
    assert!(unfiltered.contains(&"Q-F301"));
    assert!(unfiltered.contains(&"Q-F302"));

    let none = engine
        .find_within_distance(&region, Some("q-no-such-type"), 0.0)
        .await
        .expect("unknown type query");
    assert!(none.is_empty());

    unseed_file(&mut mgr, 2301, "q-swath-a", "Q-F301").await;
    unseed_file(&mut mgr, 2302, "q-swath-b", "Q-F302").await;
    mgr.save().await.expect("cleanup save");
}
