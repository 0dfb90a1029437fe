use ndarray::Array2;
use single_utilities::traits::FloatOpsTS;

use super::{DatasetId, NumericMatrixSource, PropertyStore, RowFilter};
use crate::error::{DiffExprError, Result};

/// Dense row-major dataset backed by an `ndarray::Array2` (cells × genes).
#[derive(Debug, Clone)]
pub struct DenseDataset<T> {
    id: DatasetId,
    values: Array2<T>,
    column_names: Vec<String>,
    properties: PropertyStore,
}

impl<T> DenseDataset<T>
where
    T: FloatOpsTS,
{
    pub fn new(values: Array2<T>, column_names: Vec<String>) -> Result<Self> {
        if values.ncols() != column_names.len() {
            return Err(DiffExprError::DimensionMismatch {
                expected: values.ncols(),
                got: column_names.len(),
            });
        }

        Ok(DenseDataset {
            id: DatasetId::next(),
            values,
            column_names,
            properties: PropertyStore::new(),
        })
    }

    /// Build a dataset from row vectors, all of which must have `column_names.len()` entries.
    pub fn from_rows(rows: Vec<Vec<T>>, column_names: Vec<String>) -> Result<Self> {
        let n_cols = column_names.len();
        let n_rows = rows.len();
        let mut flat = Vec::with_capacity(n_rows * n_cols);
        for row in rows {
            if row.len() != n_cols {
                return Err(DiffExprError::DimensionMismatch {
                    expected: n_cols,
                    got: row.len(),
                });
            }
            flat.extend(row);
        }

        let values = Array2::from_shape_vec((n_rows, n_cols), flat).map_err(|e| {
            DiffExprError::InvalidInput {
                reason: format!("Could not shape dense matrix: {}", e),
            }
        })?;
        Self::new(values, column_names)
    }

    pub fn values(&self) -> &Array2<T> {
        &self.values
    }

    pub fn get(&self, row: usize, col: usize) -> Option<T> {
        self.values.get((row, col)).copied()
    }

    fn visit_row<F>(&self, row: usize, f: &mut F)
    where
        F: FnMut(usize, usize, T),
    {
        for (col, &value) in self.values.row(row).iter().enumerate() {
            f(row, col, value);
        }
    }
}

impl<T> NumericMatrixSource<T> for DenseDataset<T>
where
    T: FloatOpsTS,
{
    fn id(&self) -> DatasetId {
        self.id
    }

    fn num_rows(&self) -> usize {
        self.values.nrows()
    }

    fn num_columns(&self) -> usize {
        self.values.ncols()
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
                for row in 0..self.values.nrows() {
                    self.visit_row(row, &mut f);
                }
            }
            RowFilter::Range(range) => {
                let end = range.end.min(self.values.nrows());
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

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("gene{}", i)).collect()
    }

    #[test]
    fn test_from_rows_shape() {
        let dataset =
            DenseDataset::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]], names(2))
                .unwrap();
        assert_eq!(dataset.num_rows(), 3);
        assert_eq!(dataset.num_columns(), 2);
        assert_eq!(dataset.get(2, 1), Some(6.0));
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let result = DenseDataset::from_rows(vec![vec![1.0, 2.0], vec![3.0]], names(2));
        assert!(matches!(
            result,
            Err(DiffExprError::DimensionMismatch { expected: 2, got: 1 })
        ));
    }

    #[test]
    fn test_subset_visits_in_selection_order() {
        let dataset =
            DenseDataset::from_rows(vec![vec![1.0f32], vec![2.0], vec![3.0]], names(1)).unwrap();
        let mut seen = Vec::new();
        dataset.for_each_cell(RowFilter::Subset(&[2, 0]), |row, _, value| seen.push((row, value)));
        assert_eq!(seen, vec![(2, 3.0), (0, 1.0)]);
    }
}
