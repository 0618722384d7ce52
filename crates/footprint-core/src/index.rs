//! Read-only point index over footprint centroids.
//!
//! Uses an R-tree bulk-loaded once per batch. Each entry carries the global
//! row position of its centroid, so radius queries resolve directly against
//! full-length side arrays regardless of which partition asks.
use rstar::primitives::GeomWithData;
use rstar::RTree;

use crate::error::StatsError;
use crate::row::Centroid;

type IndexedCentroid = GeomWithData<[f64; 2], usize>;

/// Immutable after [`CentroidIndex::build`]; there is no insertion API, so a
/// shared reference can be queried from any number of workers.
pub struct CentroidIndex {
    tree: RTree<IndexedCentroid>,
}

impl CentroidIndex {
    /// Index every defined, finite centroid under its slice position.
    /// `None` entries (empty geometries) are skipped but keep their position.
    pub fn build(centroids: &[Option<Centroid>]) -> Self {
        let entries: Vec<IndexedCentroid> = centroids
            .iter()
            .enumerate()
            .filter_map(|(pos, c)| {
                c.filter(Centroid::is_finite)
                    .map(|c| GeomWithData::new(c.as_array(), pos))
            })
            .collect();

        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Number of indexed points.
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Global row positions of all points at distance `<= radius` from
    /// `query`, ascending.
    pub fn within(&self, query: Centroid, radius: f64) -> Result<Vec<usize>, StatsError> {
        if !query.is_finite() {
            return Err(StatsError::NonFiniteQuery {
                lon: query.lon,
                lat: query.lat,
            });
        }
        let mut hits: Vec<usize> = self
            .tree
            .locate_within_distance(query.as_array(), radius * radius)
            .map(|entry| entry.data)
            .collect();
        hits.sort_unstable();
        Ok(hits)
    }
}
