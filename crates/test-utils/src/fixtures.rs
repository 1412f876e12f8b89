//! Common test fixtures for sat-catalog tests.
//!
//! Pre-defined geometry representing typical polar-orbiter catalog
//! scenarios: a satellite scan track, regions of interest near and far
//! from it.

use catalog_common::geometry::{LineString, Polygon};

/// Scan-track fixture: a short south-west to north-east pass over central
/// Europe, from (10E, 50N) to (12E, 52N).
pub fn scan_track() -> LineString {
    match LineString::new(vec![(10.0, 50.0), (12.0, 52.0)]) {
        Ok(line) => line,
        Err(e) => panic!("fixture linestring invalid: {}", e),
    }
}

/// Scan track well away from [`swath_region`]: a pass over the central
/// Atlantic, roughly 2000 km west of the European fixtures.
pub fn atlantic_track() -> LineString {
    match LineString::new(vec![(-20.0, 48.0), (-18.0, 50.0)]) {
        Ok(line) => line,
        Err(e) => panic!("fixture linestring invalid: {}", e),
    }
}

/// Region fully containing [`scan_track`].
pub fn swath_region() -> Polygon {
    match Polygon::new(&swath_region_vertices()) {
        Ok(poly) => poly,
        Err(e) => panic!("fixture polygon invalid: {}", e),
    }
}

/// Open-ring vertices of [`swath_region`], for APIs taking raw coordinates.
pub fn swath_region_vertices() -> Vec<(f64, f64)> {
    vec![(9.0, 49.0), (13.0, 49.0), (13.0, 53.0), (9.0, 53.0)]
}

/// A larger region covering the Nordic countries, north of and disjoint
/// from [`scan_track`]. Its southern edge lies roughly 390 km from the
/// track's northern end at 52N; the edge bulges poleward along the
/// geodesic, so the gap exceeds the plain latitude difference.
pub fn nordic_region_vertices() -> Vec<(f64, f64)> {
    vec![(1.7, 54.8), (28.7, 54.9), (34.8, 71.2), (2.3, 71.7)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_track_inside_swath_region() {
        let track = scan_track();
        let region = swath_region_vertices();
        let (min_lon, max_lon) = (region[0].0, region[1].0);
        let (min_lat, max_lat) = (region[0].1, region[2].1);
        for &(lon, lat) in track.points() {
            assert!(lon > min_lon && lon < max_lon);
            assert!(lat > min_lat && lat < max_lat);
        }
    }

    #[test]
    fn test_atlantic_track_outside_swath_region() {
        let track = atlantic_track();
        for &(lon, _) in track.points() {
            assert!(lon < 9.0);
        }
    }
}
