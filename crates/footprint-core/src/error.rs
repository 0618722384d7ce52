use thiserror::Error;

/// Fatal problems while measuring a single geometry.
#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("row {row}: unsupported geometry type {kind}, expected Polygon or MultiPolygon")]
    UnsupportedGeometry { row: usize, kind: &'static str },
}

/// Row-level failures of the neighbourhood query. Absorbed per row.
#[derive(Debug, Error, PartialEq)]
pub enum StatsError {
    #[error("row {row} has no centroid (empty geometry)")]
    MissingCentroid { row: usize },

    #[error("query point ({lon}, {lat}) is not finite")]
    NonFiniteQuery { lon: f64, lat: f64 },

    #[error("neighbour position {position} outside side array of length {len}")]
    PositionOutOfRange { position: usize, len: usize },
}

#[derive(Debug, Error)]
pub enum PartitionError {
    #[error("partition count must be at least 1")]
    ZeroPartitions,

    #[error("worker pool could not be built")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("partition {partition} ({start}..{end}) lies outside {rows} rows")]
    RangeOutOfBounds { partition: usize, start: usize, end: usize, rows: usize },

    #[error("worker for partition {partition} ({start}..{end}) panicked")]
    WorkerPanicked { partition: usize, start: usize, end: usize },

    #[error("merged {got} results for {expected} rows")]
    MergeLength { expected: usize, got: usize },
}

/// Anything that aborts the whole run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Feature(#[from] FeatureError),

    #[error(transparent)]
    Partition(#[from] PartitionError),

    #[error("side array `{name}` has {got} entries, expected {expected}")]
    SideArrayLength { name: &'static str, expected: usize, got: usize },

    #[error("row at position {position} carries index {index}; rows must be numbered by position")]
    RowIndexMismatch { position: usize, index: usize },

    #[error("row {row} reached the index stage without geometry features")]
    MissingFeatures { row: usize },
}
