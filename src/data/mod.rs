//! Dataset access for differential expression.
//!
//! The engine never touches a concrete matrix type directly. Everything goes through
//! [`NumericMatrixSource`], a small capability interface that exposes the shape of the
//! matrix, its column names, a cell visitor and a string-keyed property store used to
//! persist cached per-dimension statistics.
//!
//! Two backings are provided:
//!
//! - [`DenseDataset`]: an `ndarray::Array2`, every cell is observed
//! - [`SparseDataset`]: a `nalgebra_sparse::CsrMatrix`, only stored entries are visited and
//!   unstored cells are implicit zeros
//!
//! [`AverageExpression`] wraps a dense cluster × gene matrix for single-cell mode.

use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};

use single_utilities::traits::FloatOpsTS;

mod dense;
mod expression;
mod properties;
mod sparse;

pub use dense::DenseDataset;
pub use expression::AverageExpression;
pub use properties::{PropertyStore, PropertyValue};
pub use sparse::SparseDataset;

/// Process-unique identity of a dataset instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DatasetId(u64);

impl DatasetId {
    pub(crate) fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        DatasetId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Rows visited by [`NumericMatrixSource::for_each_cell`].
#[derive(Debug, Clone)]
pub enum RowFilter<'a> {
    All,
    Range(Range<usize>),
    Subset(&'a [usize]),
}

impl RowFilter<'_> {
    /// Number of rows this filter yields for a matrix with `num_rows` rows.
    pub fn len(&self, num_rows: usize) -> usize {
        match self {
            RowFilter::All => num_rows,
            RowFilter::Range(range) => range.end.min(num_rows).saturating_sub(range.start),
            RowFilter::Subset(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self, num_rows: usize) -> bool {
        self.len(num_rows) == 0
    }
}

/// Read access to an N×D numeric matrix (rows = cells, columns = genes).
pub trait NumericMatrixSource<T>: Sync
where
    T: FloatOpsTS,
{
    fn id(&self) -> DatasetId;

    fn num_rows(&self) -> usize;

    fn num_columns(&self) -> usize;

    fn column_names(&self) -> &[String];

    /// Visit `(row, column, value)` for every observed cell of the filtered rows.
    ///
    /// Rows are visited in filter order. Dense backings yield every column of a row,
    /// sparse backings only the stored entries. Out-of-range rows must be rejected by
    /// the caller before visiting.
    fn for_each_cell<F>(&self, rows: RowFilter<'_>, f: F)
    where
        F: FnMut(usize, usize, T);

    fn properties(&self) -> &PropertyStore;

    fn properties_mut(&mut self) -> &mut PropertyStore;
}

/// Check that every index addresses a row of `dataset`.
pub fn validate_row_indices<T, S>(dataset: &S, indices: &[usize]) -> crate::error::Result<()>
where
    T: FloatOpsTS,
    S: NumericMatrixSource<T> + ?Sized,
{
    let num_rows = dataset.num_rows();
    match indices.iter().find(|&&index| index >= num_rows) {
        Some(&index) => Err(crate::error::DiffExprError::IndexOutOfBounds { index, num_rows }),
        None => Ok(()),
    }
}

/// Cell value as `f64`; values without an `f64` representation count as zero.
#[inline]
pub(crate) fn cell_value<T: FloatOpsTS>(value: T) -> f64 {
    num_traits::ToPrimitive::to_f64(&value).unwrap_or(0.0)
}
