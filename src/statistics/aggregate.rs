//! Streaming aggregation of a row selection.

use single_utilities::traits::FloatOpsTS;

use crate::data::{NumericMatrixSource, RowFilter, cell_value, validate_row_indices};
use crate::error::Result;
use crate::progress::ProgressReporter;

const ROWS_PER_PROGRESS_STEP: usize = 256;

/// Per-dimension sums and values of the rows in one selection.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionAggregate {
    rows: usize,
    sum: Vec<f64>,
    values: Vec<Vec<f64>>,
}

impl SelectionAggregate {
    /// Number of selected rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn sum(&self) -> &[f64] {
        &self.sum
    }

    /// Values per dimension, one entry per selected row.
    pub fn values(&self) -> &[Vec<f64>] {
        &self.values
    }

    /// `sum[dim] / rows`; `None` for an empty selection.
    pub fn mean(&self, dim: usize) -> Option<f64> {
        if self.rows == 0 {
            return None;
        }
        Some(self.sum[dim] / self.rows as f64)
    }

    pub fn into_parts(self) -> (usize, Vec<f64>, Vec<Vec<f64>>) {
        (self.rows, self.sum, self.values)
    }
}

/// Stream the rows in `indices` and collect per-dimension sums and value lists.
///
/// Rows are visited in `indices` order and reported to `progress` in steps through
/// [`ProgressReporter::advance`]; starting and finishing the task is left to the caller.
/// Cells a sparse dataset does not store are implicit zeros: they add nothing to the sum
/// and are appended as `0.0` to the value lists, so every list holds `indices.len()` values.
pub fn accumulate<T, S>(
    dataset: &S,
    indices: &[usize],
    progress: &dyn ProgressReporter,
) -> Result<SelectionAggregate>
where
    T: FloatOpsTS,
    S: NumericMatrixSource<T> + ?Sized,
{
    validate_row_indices(dataset, indices)?;

    let n_dims = dataset.num_columns();
    let mut sum = vec![0.0; n_dims];
    let mut values: Vec<Vec<f64>> = (0..n_dims)
        .map(|_| Vec::with_capacity(indices.len()))
        .collect();

    for chunk in indices.chunks(ROWS_PER_PROGRESS_STEP) {
        dataset.for_each_cell(RowFilter::Subset(chunk), |_, col, value: T| {
            let value = cell_value(value);
            sum[col] += value;
            values[col].push(value);
        });
        progress.advance(chunk.len());
    }

    for column in values.iter_mut() {
        column.resize(indices.len(), 0.0);
    }

    Ok(SelectionAggregate {
        rows: indices.len(),
        sum,
        values,
    })
}
