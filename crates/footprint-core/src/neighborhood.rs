//! Buffer-based spatial context for each footprint.
//!
//! For a query centroid, every indexed centroid within `radius` (the query
//! row's own centroid included) is a neighbour. The neighbours' shape ratios
//! and areas are summarised as mean / sample std / min / max.
//!
//! Count rules:
//!   0   → both summaries are `None` (no data, distinct from zero)
//!   1   → mean = min = max = the raw value, std = 0 exactly
//!   ≥ 2 → NaN values are skipped; std uses the n − 1 denominator and is
//!         NaN when fewer than two values remain
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::error::{PipelineError, StatsError};
use crate::index::CentroidIndex;
use crate::row::{Centroid, FeatureRow, NeighborStatus};

/// Distribution summary of one attribute over a neighbourhood.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

impl Summary {
    /// Summarise one attribute over all matched neighbours. `None` only
    /// when there are no neighbours.
    pub fn of<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        let all: Vec<f64> = values.into_iter().collect();
        match all.as_slice() {
            [] => None,
            &[only] => Some(Self {
                mean: only,
                std: 0.0,
                min: only,
                max: only,
            }),
            _ => Some(Self::skipping_nan(&all)),
        }
    }

    fn skipping_nan(all: &[f64]) -> Self {
        let vals: Vec<f64> = all.iter().copied().filter(|v| !v.is_nan()).collect();
        if vals.is_empty() {
            return Self {
                mean: f64::NAN,
                std: f64::NAN,
                min: f64::NAN,
                max: f64::NAN,
            };
        }
        let n = vals.len() as f64;
        let mean = vals.iter().sum::<f64>() / n;
        let std = if vals.len() < 2 {
            f64::NAN
        } else {
            let ss = vals.iter().map(|&v| (v - mean) * (v - mean)).sum::<f64>();
            (ss / (n - 1.0)).sqrt()
        };
        let min = vals.iter().copied().fold(f64::INFINITY, f64::min);
        let max = vals.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Self { mean, std, min, max }
    }
}

/// Per-row neighbourhood statistics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NeighborStats {
    /// Points within the buffer, written as `points_in_polygon_buffers`.
    pub count: usize,
    pub ls_ratio: Option<Summary>,
    pub area: Option<Summary>,
}

impl NeighborStats {
    pub fn empty() -> Self {
        Self {
            count: 0,
            ls_ratio: None,
            area: None,
        }
    }
}

/// What the per-row guard produced for one row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NeighborOutcome {
    Computed(NeighborStats),
    /// Query or statistics failed; the row's statistic columns stay null.
    Failed,
}

impl NeighborOutcome {
    pub fn status(&self) -> NeighborStatus {
        match self {
            NeighborOutcome::Computed(s) if s.count == 0 => NeighborStatus::NoNeighbors,
            NeighborOutcome::Computed(_) => NeighborStatus::Ok,
            NeighborOutcome::Failed => NeighborStatus::Failed,
        }
    }
}

/// Read-only inputs shared by every worker: the index and two side arrays
/// aligned to global row positions (not to any partition).
#[derive(Clone, Copy)]
pub struct NeighborhoodContext<'a> {
    index: &'a CentroidIndex,
    ls_ratios: &'a [f64],
    areas: &'a [f64],
    radius: f64,
}

impl<'a> NeighborhoodContext<'a> {
    /// `rows` is the full table length both side arrays must match.
    pub fn new(
        index: &'a CentroidIndex,
        ls_ratios: &'a [f64],
        areas: &'a [f64],
        radius: f64,
        rows: usize,
    ) -> Result<Self, PipelineError> {
        for (name, arr) in [("ls_ratio", ls_ratios), ("area", areas)] {
            if arr.len() != rows {
                return Err(PipelineError::SideArrayLength {
                    name,
                    expected: rows,
                    got: arr.len(),
                });
            }
        }
        Ok(Self {
            index,
            ls_ratios,
            areas,
            radius,
        })
    }

    fn lookup(arr: &[f64], position: usize) -> Result<f64, StatsError> {
        arr.get(position)
            .copied()
            .ok_or(StatsError::PositionOutOfRange {
                position,
                len: arr.len(),
            })
    }
}

/// Neighbourhood statistics for one query point.
pub fn buffer_metrics(query: Centroid, ctx: &NeighborhoodContext<'_>) -> Result<NeighborStats, StatsError> {
    let hits = ctx.index.within(query, ctx.radius)?;
    if hits.is_empty() {
        return Ok(NeighborStats::empty());
    }

    let ls = hits
        .iter()
        .map(|&pos| NeighborhoodContext::lookup(ctx.ls_ratios, pos))
        .collect::<Result<Vec<_>, _>>()?;
    let areas = hits
        .iter()
        .map(|&pos| NeighborhoodContext::lookup(ctx.areas, pos))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(NeighborStats {
        count: hits.len(),
        ls_ratio: Summary::of(ls),
        area: Summary::of(areas),
    })
}

/// Per-row guard: a failure is logged and absorbed, never propagated.
pub fn row_metrics(row: &FeatureRow, ctx: &NeighborhoodContext<'_>) -> NeighborOutcome {
    let result = row
        .centroid()
        .ok_or(StatsError::MissingCentroid { row: row.index })
        .and_then(|c| buffer_metrics(c, ctx));

    match result {
        Ok(stats) => NeighborOutcome::Computed(stats),
        Err(err) => {
            error!(row = row.index, error = %err, detail = ?err, "neighbourhood statistics failed");
            NeighborOutcome::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn index_of(points: &[(f64, f64)]) -> CentroidIndex {
        let centroids: Vec<_> = points.iter().map(|&(x, y)| Some(Centroid::new(x, y))).collect();
        CentroidIndex::build(&centroids)
    }

    #[test]
    fn zero_neighbours_yield_null_statistics() {
        let index = index_of(&[(0.0, 0.0)]);
        let ls = [1.0];
        let areas = [50.0];
        let ctx = NeighborhoodContext::new(&index, &ls, &areas, 250.0, 1).unwrap();

        let stats = buffer_metrics(Centroid::new(10_000.0, 10_000.0), &ctx).unwrap();
        assert_eq!(stats.count, 0);
        assert!(stats.ls_ratio.is_none());
        assert!(stats.area.is_none());
        assert_eq!(NeighborOutcome::Computed(stats).status(), NeighborStatus::NoNeighbors);
    }

    #[test]
    fn single_neighbour_has_exactly_zero_std() {
        let index = index_of(&[(0.0, 0.0), (1_000.0, 0.0)]);
        let ls = [2.5, 1.0];
        let areas = [120.0, 80.0];
        let ctx = NeighborhoodContext::new(&index, &ls, &areas, 250.0, 2).unwrap();

        let stats = buffer_metrics(Centroid::new(0.0, 0.0), &ctx).unwrap();
        assert_eq!(stats.count, 1);
        let ls_s = stats.ls_ratio.unwrap();
        let area_s = stats.area.unwrap();
        assert_eq!(ls_s.std, 0.0);
        assert_eq!(area_s.std, 0.0);
        assert_eq!((ls_s.mean, ls_s.min, ls_s.max), (2.5, 2.5, 2.5));
        assert_eq!((area_s.mean, area_s.min, area_s.max), (120.0, 120.0, 120.0));
    }

    #[test]
    fn two_neighbours_use_sample_std() {
        let index = index_of(&[(0.0, 0.0), (100.0, 0.0)]);
        let ls = [1.0, 3.0];
        let areas = [10.0, 20.0];
        let ctx = NeighborhoodContext::new(&index, &ls, &areas, 250.0, 2).unwrap();

        let stats = buffer_metrics(Centroid::new(0.0, 0.0), &ctx).unwrap();
        assert_eq!(stats.count, 2);
        let s = stats.ls_ratio.unwrap();
        assert_relative_eq!(s.mean, 2.0);
        assert_relative_eq!(s.std, 2.0f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(stats.area.unwrap().std, 50.0f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn matches_brute_force_scan() {
        let mut rng = StdRng::seed_from_u64(7);
        let n = 600;
        let points: Vec<(f64, f64)> = (0..n)
            .map(|_| (rng.gen_range(0.0..3_000.0), rng.gen_range(0.0..3_000.0)))
            .collect();
        let ls: Vec<f64> = (0..n).map(|_| rng.gen_range(1.0..4.0)).collect();
        let areas: Vec<f64> = (0..n).map(|_| rng.gen_range(20.0..900.0)).collect();
        let index = index_of(&points);
        let radius = 250.0;
        let ctx = NeighborhoodContext::new(&index, &ls, &areas, radius, n).unwrap();

        for &(qx, qy) in points.iter().step_by(7) {
            let stats = buffer_metrics(Centroid::new(qx, qy), &ctx).unwrap();

            let matched: Vec<usize> = (0..n)
                .filter(|&j| {
                    let (x, y) = points[j];
                    (x - qx).powi(2) + (y - qy).powi(2) <= radius * radius
                })
                .collect();
            assert_eq!(stats.count, matched.len());

            let expect_ls = Summary::of(matched.iter().map(|&j| ls[j])).unwrap();
            let expect_area = Summary::of(matched.iter().map(|&j| areas[j])).unwrap();
            let got_ls = stats.ls_ratio.unwrap();
            let got_area = stats.area.unwrap();
            for (got, want) in [(got_ls, expect_ls), (got_area, expect_area)] {
                assert_relative_eq!(got.mean, want.mean, epsilon = 1e-9);
                assert_relative_eq!(got.std, want.std, epsilon = 1e-9);
                assert_eq!(got.min, want.min);
                assert_eq!(got.max, want.max);
            }
        }
    }

    #[test]
    fn summary_skips_nan_values() {
        let s = Summary::of([1.0, f64::NAN, 3.0]).unwrap();
        assert_relative_eq!(s.mean, 2.0);
        assert_relative_eq!(s.std, 2.0f64.sqrt(), epsilon = 1e-12);
        assert_eq!(s.min, 1.0);
        assert_eq!(s.max, 3.0);
        assert!(Summary::of(std::iter::empty::<f64>()).is_none());
    }

    #[test]
    fn single_nan_value_still_has_zero_std() {
        let s = Summary::of([f64::NAN]).unwrap();
        assert_eq!(s.std, 0.0);
        assert!(s.mean.is_nan());
        assert!(s.min.is_nan());
        assert!(s.max.is_nan());
    }

    #[test]
    fn one_defined_value_among_several_has_undefined_std() {
        let s = Summary::of([f64::NAN, 4.0, f64::NAN]).unwrap();
        assert_eq!((s.mean, s.min, s.max), (4.0, 4.0, 4.0));
        assert!(s.std.is_nan());

        let s = Summary::of([f64::NAN, f64::NAN]).unwrap();
        assert!(s.mean.is_nan() && s.std.is_nan());
    }

    #[test]
    fn lone_neighbour_with_undefined_ratio_keeps_zero_std() {
        let index = index_of(&[(5.0, 5.0)]);
        let ls = [f64::NAN];
        let areas = [0.0];
        let ctx = NeighborhoodContext::new(&index, &ls, &areas, 250.0, 1).unwrap();

        let stats = buffer_metrics(Centroid::new(5.0, 5.0), &ctx).unwrap();
        assert_eq!(stats.count, 1);
        let ls_s = stats.ls_ratio.unwrap();
        assert_eq!(ls_s.std, 0.0);
        assert!(ls_s.mean.is_nan());
        assert_eq!(stats.area.unwrap(), Summary { mean: 0.0, std: 0.0, min: 0.0, max: 0.0 });
    }

    #[test]
    fn mismatched_side_array_is_rejected() {
        let index = index_of(&[(0.0, 0.0), (1.0, 0.0)]);
        let ls = [1.0, 1.0];
        let areas = [1.0];
        let err = NeighborhoodContext::new(&index, &ls, &areas, 250.0, 2).err().unwrap();
        assert!(matches!(err, PipelineError::SideArrayLength { name: "area", .. }));
    }

    #[test]
    fn out_of_range_position_is_a_row_error() {
        // Index built over three points, side arrays describing only two rows.
        let index = index_of(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)]);
        let ls = [1.0, 1.0];
        let areas = [1.0, 1.0];
        let ctx = NeighborhoodContext::new(&index, &ls, &areas, 250.0, 2).unwrap();
        let err = buffer_metrics(Centroid::new(0.0, 0.0), &ctx).unwrap_err();
        assert_eq!(err, StatsError::PositionOutOfRange { position: 2, len: 2 });
    }

    #[test]
    fn row_without_centroid_fails_in_isolation() {
        use geo::{Geometry, LineString, Polygon};

        let index = index_of(&[(0.0, 0.0)]);
        let ls = [1.0];
        let areas = [1.0];
        let ctx = NeighborhoodContext::new(&index, &ls, &areas, 250.0, 1).unwrap();

        let empty = Geometry::Polygon(Polygon::new(LineString::new(vec![]), vec![]));
        let mut row = FeatureRow::new(0, empty, Default::default());
        row.features = Some(crate::geometry::extract_features(0, &row.geometry).unwrap());

        let outcome = row_metrics(&row, &ctx);
        assert_eq!(outcome, NeighborOutcome::Failed);
        assert_eq!(outcome.status(), NeighborStatus::Failed);
    }
}
