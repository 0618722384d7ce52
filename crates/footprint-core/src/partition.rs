//! Partition-and-merge driver for the neighbourhood phase.
//!
//! Rows are split into contiguous, order-preserving ranges, one task per
//! range runs on a bounded worker pool, and results are concatenated in
//! partition sequence order (never completion order).
use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::PartitionError;
use crate::neighborhood::{row_metrics, NeighborOutcome, NeighborhoodContext};
use crate::row::FeatureRow;

/// Split `0..n` into `p` contiguous ranges. The first `p − 1` hold
/// `floor(n / p)` rows each; the last absorbs the remainder.
pub fn slice_ranges(n: usize, p: usize) -> Result<Vec<Range<usize>>, PartitionError> {
    if p == 0 {
        return Err(PartitionError::ZeroPartitions);
    }
    let chunk = n / p;
    Ok((0..p)
        .map(|i| {
            let start = i * chunk;
            let end = if i + 1 == p { n } else { start + chunk };
            start..end
        })
        .collect())
}

/// Fixed-size pool shared by the geometry and neighbourhood phases.
pub struct WorkerPool {
    pool: ThreadPool,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Result<Self, PartitionError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("buffer-worker-{i}"))
            .build()?;
        Ok(Self { pool })
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Run `op` inside the pool so nested rayon iterators use its threads.
    pub fn install<R, OP>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        self.pool.install(op)
    }

    /// Neighbourhood statistics for every row, in row order.
    pub fn dispatch(
        &self,
        rows: &[FeatureRow],
        ctx: &NeighborhoodContext<'_>,
        ranges: &[Range<usize>],
    ) -> Result<Vec<NeighborOutcome>, PartitionError> {
        self.dispatch_with(rows, ranges, |row| row_metrics(row, ctx))
    }

    /// Apply `per_row` over each partition on the pool and merge by
    /// partition sequence. A panicking task fails the whole dispatch.
    pub fn dispatch_with<T, F>(
        &self,
        rows: &[FeatureRow],
        ranges: &[Range<usize>],
        per_row: F,
    ) -> Result<Vec<T>, PartitionError>
    where
        T: Send,
        F: Fn(&FeatureRow) -> T + Sync,
    {
        for (partition, range) in ranges.iter().enumerate() {
            if range.start > range.end || range.end > rows.len() {
                return Err(PartitionError::RangeOutOfBounds {
                    partition,
                    start: range.start,
                    end: range.end,
                    rows: rows.len(),
                });
            }
        }

        let per_partition: Vec<Result<Vec<T>, PartitionError>> = self.pool.install(|| {
            ranges
                .par_iter()
                .enumerate()
                .map(|(partition, range)| {
                    let slice = &rows[range.clone()];
                    panic::catch_unwind(AssertUnwindSafe(|| slice.iter().map(&per_row).collect::<Vec<T>>()))
                        .map_err(|_| PartitionError::WorkerPanicked {
                            partition,
                            start: range.start,
                            end: range.end,
                        })
                })
                .collect()
        });

        let mut merged = Vec::with_capacity(rows.len());
        for part in per_partition {
            merged.extend(part?);
        }
        if merged.len() != rows.len() {
            return Err(PartitionError::MergeLength {
                expected: rows.len(),
                got: merged.len(),
            });
        }
        Ok(merged)
    }
}

/// Attach merged outcomes to their rows, position by position.
pub fn attach(rows: &mut [FeatureRow], outcomes: Vec<NeighborOutcome>) -> Result<(), PartitionError> {
    if outcomes.len() != rows.len() {
        return Err(PartitionError::MergeLength {
            expected: rows.len(),
            got: outcomes.len(),
        });
    }
    for (row, outcome) in rows.iter_mut().zip(outcomes) {
        row.neighborhood = Some(outcome);
    }
    Ok(())
}
