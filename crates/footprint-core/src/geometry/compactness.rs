//! Polygon compactness indices. All are 1.0 for a circle and decrease as the
//! shape elongates or its boundary roughens. Degenerate inputs (zero
//! perimeter or zero circle area) yield non-finite values.
use std::f64::consts::PI;

/// Polsby-Popper: `4πA / P²`.
#[inline]
pub fn polsby_popper(area: f64, perimeter: f64) -> f64 {
    (4.0 * PI * area) / (perimeter * perimeter)
}

/// Reock: footprint area over the area of its minimum bounding circle.
#[inline]
pub fn reock(area: f64, bounding_circle_area: f64) -> f64 {
    area / bounding_circle_area
}

/// Schwartzberg: inverse ratio of the perimeter to the circumference of the
/// circle with the same area.
#[inline]
pub fn schwartzberg(area: f64, perimeter: f64) -> f64 {
    let equal_area_circumference = 2.0 * PI * (area / PI).sqrt();
    1.0 / (perimeter / equal_area_circumference)
}
