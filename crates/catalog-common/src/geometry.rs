//! Geodetic geometry types and their WKT representation.
//!
//! Coordinates are (longitude, latitude) pairs in degrees. WKT text is the
//! interchange format with the spatial store: geometries are written through
//! `ST_GeogFromText`/`ST_GeomFromText` and read back through `ST_AsText`,
//! always as bound query parameters.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when constructing or parsing geometries.
#[derive(Debug, Error, PartialEq)]
pub enum GeometryError {
    /// Invalid WKT format.
    #[error("Invalid WKT format: {0}")]
    InvalidWkt(String),

    /// Invalid coordinate value.
    #[error("Invalid coordinate value: {0}")]
    InvalidCoordinate(String),

    /// Coordinate out of valid range.
    #[error("Coordinate out of range: {0}")]
    OutOfRange(String),

    /// Too few vertices for the geometry kind.
    #[error("Degenerate geometry: {0}")]
    Degenerate(String),
}

fn validate_coordinates(lon: f64, lat: f64) -> Result<(), GeometryError> {
    if !lon.is_finite() || !lat.is_finite() {
        return Err(GeometryError::InvalidCoordinate(format!(
            "({}, {}) is not finite",
            lon, lat
        )));
    }

    if !(-180.0..=180.0).contains(&lon) {
        return Err(GeometryError::OutOfRange(format!(
            "Longitude {} is out of range [-180, 180]",
            lon
        )));
    }

    if !(-90.0..=90.0).contains(&lat) {
        return Err(GeometryError::OutOfRange(format!(
            "Latitude {} is out of range [-90, 90]",
            lat
        )));
    }

    Ok(())
}

/// Extract the coordinate text between the outermost parentheses of a WKT
/// string, after checking the expected geometry keyword.
fn wkt_body<'a>(wkt: &'a str, keyword: &str) -> Result<&'a str, GeometryError> {
    let trimmed = wkt.trim();
    if !trimmed.to_uppercase().starts_with(keyword) {
        return Err(GeometryError::InvalidWkt(format!(
            "Expected {} geometry, got '{}'",
            keyword, trimmed
        )));
    }

    let start = trimmed
        .find('(')
        .ok_or_else(|| GeometryError::InvalidWkt("Missing opening parenthesis".to_string()))?;
    let end = trimmed
        .rfind(')')
        .ok_or_else(|| GeometryError::InvalidWkt("Missing closing parenthesis".to_string()))?;

    if end <= start {
        return Err(GeometryError::InvalidWkt(
            "Invalid parenthesis order".to_string(),
        ));
    }

    Ok(trimmed[start + 1..end].trim_matches(|c: char| c == '(' || c == ')' || c.is_whitespace()))
}

/// Parse a comma-separated list of `lon lat` pairs.
fn parse_coord_list(body: &str) -> Result<Vec<(f64, f64)>, GeometryError> {
    body.split(',')
        .map(|pair| {
            let pair = pair.trim();
            let parts: Vec<&str> = pair.split_whitespace().collect();
            if parts.len() != 2 {
                return Err(GeometryError::InvalidWkt(format!(
                    "Expected 'lon lat' format, got '{}'",
                    pair
                )));
            }

            let lon: f64 = parts[0]
                .parse()
                .map_err(|_| GeometryError::InvalidCoordinate(parts[0].to_string()))?;
            let lat: f64 = parts[1]
                .parse()
                .map_err(|_| GeometryError::InvalidCoordinate(parts[1].to_string()))?;

            validate_coordinates(lon, lat)?;
            Ok((lon, lat))
        })
        .collect()
}

fn format_coord_list(points: &[(f64, f64)]) -> String {
    points
        .iter()
        .map(|(lon, lat)| format!("{} {}", lon, lat))
        .collect::<Vec<_>>()
        .join(", ")
}

/// An ordered sequence of (lon, lat) vertices describing a path over the
/// Earth's surface, e.g. a satellite swath footprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineString {
    points: Vec<(f64, f64)>,
}

impl LineString {
    /// Create a linestring from at least two vertices.
    pub fn new(points: Vec<(f64, f64)>) -> Result<Self, GeometryError> {
        if points.len() < 2 {
            return Err(GeometryError::Degenerate(format!(
                "Linestring needs at least 2 vertices, got {}",
                points.len()
            )));
        }

        for &(lon, lat) in &points {
            validate_coordinates(lon, lat)?;
        }

        Ok(Self { points })
    }

    /// The vertices of the linestring.
    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// Serialize into WKT text: `LINESTRING (lon lat, lon lat, ...)`.
    pub fn to_wkt(&self) -> String {
        format!("LINESTRING ({})", format_coord_list(&self.points))
    }

    /// Parse from WKT text.
    ///
    /// Accepts `LINESTRING(lon lat, ...)` with or without whitespace before
    /// the parenthesis, as produced by `ST_AsText`.
    pub fn from_wkt(wkt: &str) -> Result<Self, GeometryError> {
        let body = wkt_body(wkt, "LINESTRING")?;
        Self::new(parse_coord_list(body)?)
    }
}

/// A simple polygon over the Earth's surface, held as a closed exterior
/// ring (last vertex equals the first).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    ring: Vec<(f64, f64)>,
}

impl Polygon {
    /// Create a polygon from an ordered vertex sequence.
    ///
    /// The ring is closed by appending the first vertex if the caller did
    /// not. At least 3 distinct vertices are required.
    pub fn new(vertices: &[(f64, f64)]) -> Result<Self, GeometryError> {
        let mut open: Vec<(f64, f64)> = vertices.to_vec();
        if open.len() > 1 && open.first() == open.last() {
            open.pop();
        }

        if open.len() < 3 {
            return Err(GeometryError::Degenerate(format!(
                "Polygon needs at least 3 distinct vertices, got {}",
                open.len()
            )));
        }

        for &(lon, lat) in &open {
            validate_coordinates(lon, lat)?;
        }

        let mut ring = open;
        ring.push(ring[0]);
        Ok(Self { ring })
    }

    /// The closed exterior ring, including the repeated closing vertex.
    pub fn exterior(&self) -> &[(f64, f64)] {
        &self.ring
    }

    /// The distinct vertices, without the closing repetition.
    pub fn vertices(&self) -> &[(f64, f64)] {
        &self.ring[..self.ring.len() - 1]
    }

    /// Serialize into WKT text: `POLYGON ((lon lat, ..., lon lat))`.
    pub fn to_wkt(&self) -> String {
        format!("POLYGON (({}))", format_coord_list(&self.ring))
    }

    /// Parse from WKT text, e.g. `POLYGON((1.7 54.8, 28.7 54.9, ...))`.
    pub fn from_wkt(wkt: &str) -> Result<Self, GeometryError> {
        let body = wkt_body(wkt, "POLYGON")?;
        Self::new(&parse_coord_list(body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linestring_wkt() {
        let line = LineString::new(vec![(10.0, 50.0), (12.0, 52.0)]).unwrap();
        assert_eq!(line.to_wkt(), "LINESTRING (10 50, 12 52)");
    }

    #[test]
    fn test_linestring_too_short() {
        let result = LineString::new(vec![(10.0, 50.0)]);
        assert!(matches!(result, Err(GeometryError::Degenerate(_))));
    }

    #[test]
    fn test_polygon_closes_open_ring() {
        let poly = Polygon::new(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]).unwrap();
        assert_eq!(poly.exterior().len(), 4);
        assert_eq!(poly.exterior()[0], poly.exterior()[3]);
    }

    #[test]
    fn test_polygon_keeps_closed_ring() {
        let poly =
            Polygon::new(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 0.0)]).unwrap();
        assert_eq!(poly.vertices().len(), 3);
    }

    #[test]
    fn test_polygon_degenerate() {
        let result = Polygon::new(&[(0.0, 0.0), (1.0, 0.0)]);
        assert!(matches!(result, Err(GeometryError::Degenerate(_))));
    }

    #[test]
    fn test_polygon_wkt_round_trip() {
        let poly = Polygon::new(&[(1.7, 54.8), (28.7, 54.9), (34.8, 71.2), (2.3, 71.7)]).unwrap();
        let parsed = Polygon::from_wkt(&poly.to_wkt()).unwrap();
        assert_eq!(poly, parsed);
    }

    #[test]
    fn test_coordinate_out_of_range() {
        let result = LineString::new(vec![(181.0, 0.0), (0.0, 0.0)]);
        assert!(matches!(result, Err(GeometryError::OutOfRange(_))));
    }
}
