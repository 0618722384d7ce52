//! Per-row footprint measurements. No cross-row state.
//!
//! Polygon and MultiPolygon footprints are accepted; every other geometry
//! type is fatal. Empty footprints are measured (zero area, no centroid)
//! rather than rejected so the neighbourhood phase can absorb them per row.
pub mod bounding_circle;
pub mod compactness;

use geo::{Area, BoundingRect, Centroid as _, ConvexHull, EuclideanLength, Geometry, MultiPolygon, Polygon};
use serde::{Deserialize, Serialize};

use crate::error::FeatureError;
use crate::row::Centroid;
use bounding_circle::minimum_bounding_circle;
use compactness::{polsby_popper, reock, schwartzberg};

/// Scalar measurements of one footprint, in CRS units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeometryFeatures {
    /// Unsigned planar area.
    pub area: f64,
    /// Boundary length, exterior plus interior rings.
    pub perimeter: f64,
    /// Exterior ring points minus the closing point, summed over parts.
    pub vertex_count: usize,
    /// Bounding box extent along y.
    pub length: f64,
    /// Bounding box extent along x.
    pub width: f64,
    pub long_side: f64,
    pub short_side: f64,
    /// `long_side / short_side`; non-finite when the short side is zero.
    pub ls_ratio: f64,
    pub pp_compactness: f64,
    pub min_bounding_circle_area: f64,
    pub reock_compactness: f64,
    pub sch_compactness: f64,
    /// `None` for empty geometries.
    pub centroid: Option<Centroid>,
}

/// Measure a footprint. `row` is only used to label errors.
pub fn extract_features(row: usize, geometry: &Geometry<f64>) -> Result<GeometryFeatures, FeatureError> {
    let parts = footprint_parts(row, geometry)?;

    let area = parts.unsigned_area();
    let perimeter = perimeter(&parts);
    let vertex_count = count_vertices(&parts);

    let (width, length) = match parts.bounding_rect() {
        Some(rect) => (rect.width(), rect.height()),
        None => (f64::NAN, f64::NAN),
    };
    // f64::max/min would drop a single NaN operand.
    let (long_side, short_side) = if width.is_nan() || length.is_nan() {
        (f64::NAN, f64::NAN)
    } else {
        (width.max(length), width.min(length))
    };
    let ls_ratio = long_side / short_side;

    let min_bounding_circle_area = if parts.0.is_empty() {
        f64::NAN
    } else {
        let hull = parts.convex_hull();
        let points: Vec<_> = hull.exterior().coords().copied().collect();
        minimum_bounding_circle(&points).map_or(f64::NAN, |c| c.area())
    };

    let centroid = parts
        .centroid()
        .map(|p| Centroid::new(p.x(), p.y()));

    Ok(GeometryFeatures {
        area,
        perimeter,
        vertex_count,
        length,
        width,
        long_side,
        short_side,
        ls_ratio,
        pp_compactness: polsby_popper(area, perimeter),
        min_bounding_circle_area,
        reock_compactness: reock(area, min_bounding_circle_area),
        sch_compactness: schwartzberg(area, perimeter),
        centroid,
    })
}

/// Exterior boundary points minus the closing point, per part, summed.
pub fn count_vertices(parts: &MultiPolygon<f64>) -> usize {
    parts
        .iter()
        .map(|p| p.exterior().0.len().saturating_sub(1))
        .sum()
}

fn perimeter(parts: &MultiPolygon<f64>) -> f64 {
    parts
        .iter()
        .map(|p| {
            p.exterior().euclidean_length()
                + p.interiors().iter().map(|r| r.euclidean_length()).sum::<f64>()
        })
        .sum()
}

/// Normalise to a MultiPolygon, dropping parts with an empty exterior ring.
fn footprint_parts(row: usize, geometry: &Geometry<f64>) -> Result<MultiPolygon<f64>, FeatureError> {
    let polygons: Vec<Polygon<f64>> = match geometry {
        Geometry::Polygon(p) => vec![p.clone()],
        Geometry::MultiPolygon(mp) => mp.0.clone(),
        other => {
            return Err(FeatureError::UnsupportedGeometry {
                row,
                kind: geometry_kind(other),
            })
        }
    };
    Ok(MultiPolygon::new(
        polygons
            .into_iter()
            .filter(|p| !p.exterior().0.is_empty())
            .collect(),
    ))
}

fn geometry_kind(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}
