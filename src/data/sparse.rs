use nalgebra_sparse::CsrMatrix;
use single_utilities::traits::FloatOpsTS;

use super::{DatasetId, NumericMatrixSource, PropertyStore, RowFilter};
use crate::error::{DiffExprError, Result};

/// Sparse dataset backed by a `CsrMatrix` (cells × genes).
///
/// Only stored entries are visited; every other cell is an implicit zero.
#[derive(Debug, Clone)]
pub struct SparseDataset<T> {
    id: DatasetId,
    matrix: CsrMatrix<T>,
    column_names: Vec<String>,
    properties: PropertyStore,
}

impl<T> SparseDataset<T>
where
    T: FloatOpsTS,
{
    pub fn new(matrix: CsrMatrix<T>, column_names: Vec<String>) -> Result<Self> {
        if matrix.ncols() != column_names.len() {
            return Err(DiffExprError::DimensionMismatch {
                expected: matrix.ncols(),
                got: column_names.len(),
            });
        }

        Ok(SparseDataset {
            id: DatasetId::next(),
            matrix,
            column_names,
            properties: PropertyStore::new(),
        })
    }

    pub fn matrix(&self) -> &CsrMatrix<T> {
        &self.matrix
    }

    fn visit_row<F>(&self, row: usize, f: &mut F)
    where
        F: FnMut(usize, usize, T),
    {
        let csr_row = self.matrix.row(row);
        for (&col, &value) in csr_row.col_indices().iter().zip(csr_row.values()) {
            f(row, col, value);
        }
    }
}

impl<T> NumericMatrixSource<T> for SparseDataset<T>
where
    T: FloatOpsTS,
{
    fn id(&self) -> DatasetId {
        self.id
    }

    fn num_rows(&self) -> usize {
        self.matrix.nrows()
    }

    fn num_columns(&self) -> usize {
        self.matrix.ncols()
    }

    fn column_names(&self) -> &[String] {
        &self.column_names
    }

    fn for_each_cell<F>(&self, rows: RowFilter<'_>, mut f: F)
    where
        F: FnMut(usize, usize, T),
    {
        match rows {
            RowFilter::All => {
                for row in 0..self.matrix.nrows() {
                    self.visit_row(row, &mut f);
                }
            }
            RowFilter::Range(range) => {
                let end = range.end.min(self.matrix.nrows());
                for row in range.start..end {
                    self.visit_row(row, &mut f);
                }
            }
            RowFilter::Subset(rows) => {
                for &row in rows {
                    self.visit_row(row, &mut f);
                }
            }
        }
    }

    fn properties(&self) -> &PropertyStore {
        &self.properties
    }

    fn properties_mut(&mut self) -> &mut PropertyStore {
        &mut self.properties
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra_sparse::CooMatrix;

    #[test]
    fn test_only_stored_entries_are_visited() {
        // Row 0: [1, 0, 2]
        // Row 1: [0, 0, 0]
        // Row 2: [0, 5, 0]
        let coo =
            CooMatrix::try_from_triplets(3, 3, vec![0, 0, 2], vec![0, 2, 1], vec![1.0, 2.0, 5.0])
                .unwrap();
        let dataset = SparseDataset::new(
            CsrMatrix::from(&coo),
            vec!["a".to_string(), "b".to_string(), "c".to_string()],
        )
        .unwrap();

        let mut seen = Vec::new();
        dataset.for_each_cell(RowFilter::All, |row, col, value| seen.push((row, col, value)));
        assert_eq!(seen, vec![(0, 0, 1.0), (0, 2, 2.0), (2, 1, 5.0)]);

        seen.clear();
        dataset.for_each_cell(RowFilter::Subset(&[1, 2]), |row, col, value| {
            seen.push((row, col, value))
        });
        assert_eq!(seen, vec![(2, 1, 5.0)]);
    }

    #[test]
    fn test_column_name_count_checked() {
        let coo = CooMatrix::<f64>::new(2, 3);
        let result = SparseDataset::new(CsrMatrix::from(&coo), vec!["a".to_string()]);
        assert!(result.is_err());
    }
}
