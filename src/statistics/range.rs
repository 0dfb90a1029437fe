//! Per-dimension value ranges used for min-max normalization.
//!
//! Ranges are computed once per dataset with a single reduction-parallel sweep over row
//! chunks and persisted into the dataset's property store under [`MIN_PROPERTY`] and
//! [`MAX_PROPERTY`]. The maximum is stored before inversion; every load derives the rescale
//! factor from the stored pair again, so a freshly computed and a reloaded
//! [`DimensionStatistics`] are identical.

use rayon::iter::{IntoParallelIterator, ParallelIterator};
use single_utilities::traits::FloatOpsTS;

use crate::data::{DatasetId, NumericMatrixSource, RowFilter, cell_value};

pub const MIN_PROPERTY: &str = "min";
pub const MAX_PROPERTY: &str = "max";

const ROWS_PER_CHUNK: usize = 1024;

/// Per-dimension minimum and rescale factor `1 / (max - min)`.
#[derive(Debug, Clone, PartialEq)]
pub struct DimensionStatistics {
    min: Vec<f64>,
    rescale: Vec<f64>,
}

impl DimensionStatistics {
    /// Build statistics from raw per-dimension minima and maxima.
    pub fn from_min_max(min: &[f64], max: &[f64]) -> Self {
        let rescale = min
            .iter()
            .zip(max)
            .map(|(&lo, &hi)| {
                let range = hi - lo;
                if range != 0.0 { 1.0 / range } else { 1.0 }
            })
            .collect();

        DimensionStatistics {
            min: min.to_vec(),
            rescale,
        }
    }

    pub fn len(&self) -> usize {
        self.min.len()
    }

    pub fn is_empty(&self) -> bool {
        self.min.is_empty()
    }

    pub fn min(&self) -> &[f64] {
        &self.min
    }

    pub fn rescale(&self) -> &[f64] {
        &self.rescale
    }

    /// `(value - min[dim]) * rescale[dim]`
    #[inline]
    pub fn normalize(&self, dim: usize, value: f64) -> f64 {
        (value - self.min[dim]) * self.rescale[dim]
    }
}

/// Memoizes the statistics of the most recently used dataset.
///
/// Lookups go memo -> dataset property store -> full scan. A different dataset identity
/// invalidates the memo.
#[derive(Debug, Clone, Default)]
pub struct DimensionRangeCache {
    memo: Option<(DatasetId, DimensionStatistics)>,
}

impl DimensionRangeCache {
    pub fn new() -> Self {
        DimensionRangeCache::default()
    }

    pub fn get_or_compute<T, S>(&mut self, dataset: &mut S) -> DimensionStatistics
    where
        T: FloatOpsTS,
        S: NumericMatrixSource<T>,
    {
        if let Some((id, stats)) = &self.memo {
            if *id == dataset.id() && stats.len() == dataset.num_columns() {
                return stats.clone();
            }
        }

        let stats = load_or_compute_statistics(dataset);
        self.memo = Some((dataset.id(), stats.clone()));
        stats
    }

    pub fn invalidate(&mut self) {
        self.memo = None;
    }
}

/// Load cached statistics from the property store, or scan the dataset and persist them.
pub fn load_or_compute_statistics<T, S>(dataset: &mut S) -> DimensionStatistics
where
    T: FloatOpsTS,
    S: NumericMatrixSource<T>,
{
    if let Some(stats) = load_statistics(dataset) {
        return stats;
    }

    let (min, max) = scan_ranges(dataset);
    let stats = DimensionStatistics::from_min_max(&min, &max);

    let properties = dataset.properties_mut();
    properties.set_floats(MIN_PROPERTY, min);
    properties.set_floats(MAX_PROPERTY, max);

    stats
}

/// Statistics persisted in the property store, if present and sized for the dataset.
pub fn load_statistics<T, S>(dataset: &S) -> Option<DimensionStatistics>
where
    T: FloatOpsTS,
    S: NumericMatrixSource<T> + ?Sized,
{
    let properties = dataset.properties();
    let min = properties.get_floats(MIN_PROPERTY)?;
    let max = properties.get_floats(MAX_PROPERTY)?;

    let n_dims = dataset.num_columns();
    if min.len() != n_dims || max.len() != n_dims {
        log::debug!(
            "Cached dimension ranges have {} / {} entries for {} dimensions, recomputing",
            min.len(),
            max.len(),
            n_dims
        );
        return None;
    }

    Some(DimensionStatistics::from_min_max(min, max))
}

/// One pass over every stored cell, returning per-dimension `(min, max)`.
///
/// Dimensions observed in fewer cells than there are rows (sparse input) have their range
/// widened to include the implicit zero. Dimensions with no observations get `0..0`.
pub fn scan_ranges<T, S>(dataset: &S) -> (Vec<f64>, Vec<f64>)
where
    T: FloatOpsTS,
    S: NumericMatrixSource<T> + ?Sized,
{
    let n_rows = dataset.num_rows();
    let n_dims = dataset.num_columns();
    let n_chunks = n_rows.div_ceil(ROWS_PER_CHUNK);

    log::debug!(
        "Scanning value ranges of {} rows x {} dimensions in {} chunks",
        n_rows,
        n_dims,
        n_chunks
    );

    let accumulator = (0..n_chunks)
        .into_par_iter()
        .map(|chunk| {
            let start = chunk * ROWS_PER_CHUNK;
            let end = (start + ROWS_PER_CHUNK).min(n_rows);
            let mut local = RangeAccumulator::new(n_dims);
            dataset.for_each_cell(RowFilter::Range(start..end), |_, col, value: T| {
                local.observe(col, cell_value(value));
            });
            local
        })
        .reduce(|| RangeAccumulator::new(n_dims), RangeAccumulator::merge);

    accumulator.finish(n_rows)
}

#[derive(Debug, Clone)]
struct RangeAccumulator {
    min: Vec<f64>,
    max: Vec<f64>,
    observed: Vec<usize>,
}

impl RangeAccumulator {
    fn new(n_dims: usize) -> Self {
        RangeAccumulator {
            min: vec![f64::INFINITY; n_dims],
            max: vec![f64::NEG_INFINITY; n_dims],
            observed: vec![0; n_dims],
        }
    }

    #[inline]
    fn observe(&mut self, dim: usize, value: f64) {
        if value < self.min[dim] {
            self.min[dim] = value;
        }
        if value > self.max[dim] {
            self.max[dim] = value;
        }
        self.observed[dim] += 1;
    }

    fn merge(mut self, other: Self) -> Self {
        for dim in 0..self.min.len() {
            self.min[dim] = self.min[dim].min(other.min[dim]);
            self.max[dim] = self.max[dim].max(other.max[dim]);
            self.observed[dim] += other.observed[dim];
        }
        self
    }

    fn finish(mut self, n_rows: usize) -> (Vec<f64>, Vec<f64>) {
        for dim in 0..self.min.len() {
            if self.observed[dim] < n_rows || !self.min[dim].is_finite() {
                // Implicit zeros belong to the range; also covers unobserved dimensions
                self.min[dim] = self.min[dim].min(0.0);
                self.max[dim] = self.max[dim].max(0.0);
            }
        }
        (self.min, self.max)
    }
}
