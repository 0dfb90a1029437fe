use std::collections::HashMap;

use ndarray::Array2;

use super::{DenseDataset, NumericMatrixSource};
use crate::error::{DiffExprError, Result};

/// Cluster × gene matrix of precomputed average expression.
///
/// The matrix is held as a [`DenseDataset`] so it is visited, range-scanned and normalized
/// exactly like the main dataset. Rows are clusters, columns are genes.
#[derive(Debug, Clone)]
pub struct AverageExpression {
    dataset: DenseDataset<f64>,
    cluster_names: Vec<String>,
    cluster_index: HashMap<String, usize>,
}

impl AverageExpression {
    pub fn new(
        cluster_names: Vec<String>,
        gene_names: Vec<String>,
        values: Array2<f64>,
    ) -> Result<Self> {
        if values.nrows() != cluster_names.len() {
            return Err(DiffExprError::DimensionMismatch {
                expected: values.nrows(),
                got: cluster_names.len(),
            });
        }

        let mut cluster_index = HashMap::with_capacity(cluster_names.len());
        for (row, name) in cluster_names.iter().enumerate() {
            if cluster_index.contains_key(name) {
                log::warn!(
                    "Cluster '{}' appears more than once in the average expression matrix, keeping the first row",
                    name
                );
                continue;
            }
            cluster_index.insert(name.clone(), row);
        }

        Ok(AverageExpression {
            dataset: DenseDataset::new(values, gene_names)?,
            cluster_names,
            cluster_index,
        })
    }

    pub fn dataset(&self) -> &DenseDataset<f64> {
        &self.dataset
    }

    pub fn dataset_mut(&mut self) -> &mut DenseDataset<f64> {
        &mut self.dataset
    }

    pub fn cluster_names(&self) -> &[String] {
        &self.cluster_names
    }

    pub fn gene_names(&self) -> &[String] {
        self.dataset.column_names()
    }

    /// Matrix row holding the averages of `cluster`.
    pub fn cluster_row(&self, cluster: &str) -> Option<usize> {
        self.cluster_index.get(cluster).copied()
    }

    pub fn num_clusters(&self) -> usize {
        self.cluster_names.len()
    }

    pub fn num_genes(&self) -> usize {
        self.dataset.num_columns()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_cluster_lookup_keeps_first_duplicate() {
        let expression = AverageExpression::new(
            vec!["T".to_string(), "B".to_string(), "T".to_string()],
            vec!["CD3E".to_string(), "MS4A1".to_string()],
            array![[5.0, 0.1], [0.2, 4.0], [9.0, 9.0]],
        )
        .unwrap();

        assert_eq!(expression.cluster_row("T"), Some(0));
        assert_eq!(expression.cluster_row("B"), Some(1));
        assert_eq!(expression.cluster_row("NK"), None);
        assert_eq!(expression.num_clusters(), 3);
        assert_eq!(expression.num_genes(), 2);
    }

    #[test]
    fn test_row_label_count_checked() {
        let result = AverageExpression::new(
            vec!["T".to_string()],
            vec!["CD3E".to_string()],
            array![[1.0], [2.0]],
        );
        assert!(result.is_err());
    }
}
