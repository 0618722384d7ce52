//! Geometric and spatial-context features for building footprints.
//!
//! Stage order: geometry features → centroid index → neighbourhood
//! statistics over partitions → merge. See [`pipeline::FeaturePipeline`].
pub mod config;
pub mod error;
pub mod geometry;
pub mod index;
pub mod neighborhood;
pub mod partition;
pub mod pipeline;
pub mod row;

pub use config::PipelineConfig;
pub use error::{FeatureError, PartitionError, PipelineError, StatsError};
pub use geometry::{extract_features, GeometryFeatures};
pub use index::CentroidIndex;
pub use neighborhood::{buffer_metrics, NeighborOutcome, NeighborStats, NeighborhoodContext, Summary};
pub use partition::{slice_ranges, WorkerPool};
pub use pipeline::{FeaturePipeline, FeatureSink, FeatureSource, RunSummary, Stage};
pub use row::{Centroid, FeatureRow, NeighborStatus};
