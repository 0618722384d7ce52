//! Run orchestrator: load → geometry features → index → partitioned
//! dispatch → merge → persist.
//!
//! The run is linear with no retries. Any error outside the per-row
//! neighbourhood guard aborts it; nothing is persisted in that case.
use anyhow::Context;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::geometry::extract_features;
use crate::index::CentroidIndex;
use crate::neighborhood::NeighborhoodContext;
use crate::partition::{attach, slice_ranges, WorkerPool};
use crate::row::{FeatureRow, NeighborStatus};

// ── Seams ─────────────────────────────────────────────────────────────────────

/// Reads the whole source table in one go. Row `i` must carry `index == i`.
pub trait FeatureSource {
    fn load(&mut self) -> anyhow::Result<Vec<FeatureRow>>;
}

/// Writes the enriched table in one bulk operation.
pub trait FeatureSink {
    fn persist(&mut self, rows: &[FeatureRow]) -> anyhow::Result<()>;
}

// ── State machine ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Loaded,
    GeometryFeaturesComputed,
    IndexBuilt,
    PartitionedDispatch,
    Merged,
    Persisted,
}

impl Stage {
    /// The only legal successor; `None` after `Persisted`.
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Loaded => Some(Stage::GeometryFeaturesComputed),
            Stage::GeometryFeaturesComputed => Some(Stage::IndexBuilt),
            Stage::IndexBuilt => Some(Stage::PartitionedDispatch),
            Stage::PartitionedDispatch => Some(Stage::Merged),
            Stage::Merged => Some(Stage::Persisted),
            Stage::Persisted => None,
        }
    }
}

fn advance(stage: &mut Stage, to: Stage) {
    debug_assert_eq!(stage.next(), Some(to), "illegal stage transition {stage:?} -> {to:?}");
    *stage = to;
    debug!(stage = ?to, "stage reached");
}

/// Counts reported when a run finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub rows: usize,
    /// Rows whose centroid went into the index.
    pub indexed: usize,
    pub ok: usize,
    pub no_neighbors: usize,
    pub failed: usize,
    pub stage: Stage,
}

impl RunSummary {
    fn from_rows(rows: &[FeatureRow], stage: Stage) -> Self {
        let count = |status: NeighborStatus| rows.iter().filter(|r| r.status() == Some(status)).count();
        Self {
            rows: rows.len(),
            indexed: rows.iter().filter(|r| r.centroid().is_some_and(|c| c.is_finite())).count(),
            ok: count(NeighborStatus::Ok),
            no_neighbors: count(NeighborStatus::NoNeighbors),
            failed: count(NeighborStatus::Failed),
            stage,
        }
    }
}

// ── Orchestrator ──────────────────────────────────────────────────────────────

pub struct FeaturePipeline {
    config: PipelineConfig,
    pool: WorkerPool,
}

impl FeaturePipeline {
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        let pool = WorkerPool::new(config.workers)?;
        Ok(Self { config, pool })
    }

    /// Full run against a source and a sink.
    pub fn run(&self, source: &mut dyn FeatureSource, sink: &mut dyn FeatureSink) -> anyhow::Result<RunSummary> {
        info!("pulling data");
        let rows = source.load().context("loading source table")?;
        let mut stage = Stage::Loaded;
        info!(rows = rows.len(), "data pulled");

        let rows = self.enrich_from(rows, &mut stage)?;

        info!(rows = rows.len(), "merged partitions, writing results");
        sink.persist(&rows).context("writing results table")?;
        advance(&mut stage, Stage::Persisted);

        let summary = RunSummary::from_rows(&rows, stage);
        info!(
            rows = summary.rows,
            ok = summary.ok,
            no_neighbors = summary.no_neighbors,
            failed = summary.failed,
            "finished"
        );
        Ok(summary)
    }

    /// Every stage between `Loaded` and `Merged` over in-memory rows.
    pub fn enrich(&self, rows: Vec<FeatureRow>) -> Result<Vec<FeatureRow>, PipelineError> {
        let mut stage = Stage::Loaded;
        self.enrich_from(rows, &mut stage)
    }

    fn enrich_from(&self, mut rows: Vec<FeatureRow>, stage: &mut Stage) -> Result<Vec<FeatureRow>, PipelineError> {
        if let Some((position, row)) = rows.iter().enumerate().find(|(pos, r)| r.index != *pos) {
            return Err(PipelineError::RowIndexMismatch {
                position,
                index: row.index,
            });
        }

        // ── Geometry features ───────────────────────────────────────────────
        info!("computing geometry features");
        self.compute_geometry_features(&mut rows)?;
        advance(stage, Stage::GeometryFeaturesComputed);

        // ── Index and side arrays ───────────────────────────────────────────
        let mut centroids = Vec::with_capacity(rows.len());
        let mut ls_ratios = Vec::with_capacity(rows.len());
        let mut areas = Vec::with_capacity(rows.len());
        for row in &rows {
            let f = row
                .features
                .as_ref()
                .ok_or(PipelineError::MissingFeatures { row: row.index })?;
            centroids.push(f.centroid);
            ls_ratios.push(f.ls_ratio);
            areas.push(f.area);
        }
        let index = CentroidIndex::build(&centroids);
        let unindexed = rows.len() - index.len();
        if unindexed > 0 {
            warn!(unindexed, "rows without a usable centroid are left out of the index");
        }
        info!(points = index.len(), "centroid index built");
        advance(stage, Stage::IndexBuilt);

        // ── Partitioned dispatch ────────────────────────────────────────────
        let ctx = NeighborhoodContext::new(&index, &ls_ratios, &areas, self.config.radius, rows.len())?;
        let ranges = slice_ranges(rows.len(), self.config.partitions)?;
        info!(
            partitions = ranges.len(),
            workers = self.pool.workers(),
            radius = self.config.radius,
            "going parallel"
        );
        let outcomes = self.pool.dispatch(&rows, &ctx, &ranges)?;
        advance(stage, Stage::PartitionedDispatch);

        // ── Merge ───────────────────────────────────────────────────────────
        attach(&mut rows, outcomes)?;
        advance(stage, Stage::Merged);

        Ok(rows)
    }

    /// Per-row measurements on the worker pool. An unsupported geometry
    /// anywhere fails the whole stage.
    pub fn compute_geometry_features(&self, rows: &mut [FeatureRow]) -> Result<(), PipelineError> {
        self.pool.install(|| {
            rows.par_iter_mut().try_for_each(|row| {
                row.features = Some(extract_features(row.index, &row.geometry)?);
                Ok::<(), PipelineError>(())
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_form_a_single_linear_chain() {
        let mut stage = Stage::Loaded;
        let mut seen = vec![stage];
        while let Some(next) = stage.next() {
            assert!(next > stage);
            stage = next;
            seen.push(stage);
        }
        assert_eq!(
            seen,
            vec![
                Stage::Loaded,
                Stage::GeometryFeaturesComputed,
                Stage::IndexBuilt,
                Stage::PartitionedDispatch,
                Stage::Merged,
                Stage::Persisted,
            ]
        );
    }

    #[test]
    fn invalid_config_is_rejected_before_building_the_pool() {
        let cfg = PipelineConfig {
            workers: 0,
            ..Default::default()
        };
        assert!(matches!(FeaturePipeline::new(cfg), Err(PipelineError::InvalidConfig(_))));
    }

    #[test]
    fn empty_table_passes_through() {
        let pipeline = FeaturePipeline::new(PipelineConfig {
            workers: 2,
            partitions: 3,
            ..Default::default()
        })
        .unwrap();
        let rows = pipeline.enrich(Vec::new()).unwrap();
        assert!(rows.is_empty());
    }
}
