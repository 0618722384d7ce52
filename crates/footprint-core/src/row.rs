use geo::Geometry;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::geometry::GeometryFeatures;
use crate::neighborhood::{NeighborOutcome, NeighborStats, Summary};

/// Planar centroid of a footprint, in the input CRS.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Centroid {
    pub lon: f64,
    pub lat: f64,
}

impl Centroid {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.lon.is_finite() && self.lat.is_finite()
    }

    #[inline]
    pub fn as_array(&self) -> [f64; 2] {
        [self.lon, self.lat]
    }
}

/// Outcome of the neighbourhood phase for one row, as written to `buffer_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeighborStatus {
    Ok,
    NoNeighbors,
    Failed,
}

/// One footprint record. `index` is its position in the source table and is
/// never reassigned; every stage preserves row order.
#[derive(Debug, Clone)]
pub struct FeatureRow {
    pub index: usize,
    pub geometry: Geometry<f64>,
    /// Identifier fields carried through from the source untouched.
    pub properties: Map<String, Value>,
    pub features: Option<GeometryFeatures>,
    pub neighborhood: Option<NeighborOutcome>,
}

impl FeatureRow {
    pub fn new(index: usize, geometry: Geometry<f64>, properties: Map<String, Value>) -> Self {
        Self {
            index,
            geometry,
            properties,
            features: None,
            neighborhood: None,
        }
    }

    pub fn centroid(&self) -> Option<Centroid> {
        self.features.as_ref().and_then(|f| f.centroid)
    }

    /// Statistics if the neighbourhood query succeeded for this row.
    pub fn neighbor_stats(&self) -> Option<&NeighborStats> {
        match &self.neighborhood {
            Some(NeighborOutcome::Computed(stats)) => Some(stats),
            _ => None,
        }
    }

    /// `None` until the merge step has attached an outcome.
    pub fn status(&self) -> Option<NeighborStatus> {
        self.neighborhood.as_ref().map(NeighborOutcome::status)
    }

    /// All derived columns keyed by output column name. Undefined and
    /// non-finite values become JSON `null`.
    pub fn derived_columns(&self) -> Map<String, Value> {
        let mut cols = Map::new();

        if let Some(f) = &self.features {
            cols.insert("new_sqmeters".into(), Value::from(f.area));
            cols.insert("perimeter".into(), Value::from(f.perimeter));
            cols.insert("vertex_count".into(), Value::from(f.vertex_count));
            cols.insert("length".into(), Value::from(f.length));
            cols.insert("width".into(), Value::from(f.width));
            cols.insert("long_side".into(), Value::from(f.long_side));
            cols.insert("short_side".into(), Value::from(f.short_side));
            cols.insert("ls_ratio".into(), Value::from(f.ls_ratio));
            cols.insert("pp_compactness".into(), Value::from(f.pp_compactness));
            cols.insert("min_bounding_circle_area".into(), Value::from(f.min_bounding_circle_area));
            cols.insert("reock_compactness".into(), Value::from(f.reock_compactness));
            cols.insert("sch_compactness".into(), Value::from(f.sch_compactness));
            cols.insert("lon".into(), f.centroid.map_or(Value::Null, |c| Value::from(c.lon)));
            cols.insert("lat".into(), f.centroid.map_or(Value::Null, |c| Value::from(c.lat)));
        }

        let stats = self.neighbor_stats();
        cols.insert(
            "points_in_polygon_buffers".into(),
            stats.map_or(Value::Null, |s| Value::from(s.count)),
        );
        insert_summary(&mut cols, "ls_ratios", stats.and_then(|s| s.ls_ratio));
        insert_summary(&mut cols, "area", stats.and_then(|s| s.area));
        cols.insert(
            "buffer_status".into(),
            self.status()
                .and_then(|s| serde_json::to_value(s).ok())
                .unwrap_or(Value::Null),
        );

        cols
    }
}

fn insert_summary(cols: &mut Map<String, Value>, prefix: &str, summary: Option<Summary>) {
    let fields = [
        ("mean", summary.map(|s| s.mean)),
        ("std", summary.map(|s| s.std)),
        ("min", summary.map(|s| s.min)),
        ("max", summary.map(|s| s.max)),
    ];
    for (name, value) in fields {
        cols.insert(
            format!("{prefix}_{name}"),
            value.map_or(Value::Null, Value::from),
        );
    }
}
