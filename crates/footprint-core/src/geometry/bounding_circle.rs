//! Minimum enclosing circle of a planar point set (incremental Welzl).
//!
//! Callers pass convex hull vertices, so the cubic worst case of the
//! unshuffled incremental form stays on a handful of points per footprint.
use geo::Coord;
use std::f64::consts::PI;

/// Relative slack for the containment test.
const CONTAINS_EPS: f64 = 1e-10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub center: Coord<f64>,
    pub radius: f64,
}

impl Circle {
    fn at_point(p: Coord<f64>) -> Self {
        Self { center: p, radius: 0.0 }
    }

    fn from_diameter(a: Coord<f64>, b: Coord<f64>) -> Self {
        let center = Coord {
            x: (a.x + b.x) / 2.0,
            y: (a.y + b.y) / 2.0,
        };
        Self { center, radius: dist(center, a).max(dist(center, b)) }
    }

    /// Circle through three points. Collinear triples fall back to the
    /// circle on the farthest pair.
    fn circumscribe(a: Coord<f64>, b: Coord<f64>, c: Coord<f64>) -> Self {
        let bx = b.x - a.x;
        let by = b.y - a.y;
        let cx = c.x - a.x;
        let cy = c.y - a.y;
        let d = 2.0 * (bx * cy - by * cx);
        if d.abs() < f64::EPSILON {
            let candidates = [Self::from_diameter(a, b), Self::from_diameter(a, c), Self::from_diameter(b, c)];
            return candidates
                .into_iter()
                .fold(Self::at_point(a), |best, c| if c.radius > best.radius { c } else { best });
        }
        let b2 = bx * bx + by * by;
        let c2 = cx * cx + cy * cy;
        let ux = (cy * b2 - by * c2) / d;
        let uy = (bx * c2 - cx * b2) / d;
        let center = Coord { x: a.x + ux, y: a.y + uy };
        let radius = dist(center, a).max(dist(center, b)).max(dist(center, c));
        Self { center, radius }
    }

    pub fn contains(&self, p: Coord<f64>) -> bool {
        dist(self.center, p) <= self.radius * (1.0 + CONTAINS_EPS) + CONTAINS_EPS
    }

    pub fn area(&self) -> f64 {
        PI * self.radius * self.radius
    }
}

#[inline]
fn dist(a: Coord<f64>, b: Coord<f64>) -> f64 {
    (a.x - b.x).hypot(a.y - b.y)
}

/// Smallest circle containing every point, or `None` for an empty slice.
pub fn minimum_bounding_circle(points: &[Coord<f64>]) -> Option<Circle> {
    let mut circle = Circle::at_point(*points.first()?);

    for i in 1..points.len() {
        let p = points[i];
        if circle.contains(p) {
            continue;
        }
        circle = Circle::at_point(p);
        for j in 0..i {
            let q = points[j];
            if circle.contains(q) {
                continue;
            }
            circle = Circle::from_diameter(p, q);
            for k in 0..j {
                let r = points[k];
                if !circle.contains(r) {
                    circle = Circle::circumscribe(p, q, r);
                }
            }
        }
    }

    Some(circle)
}
