//! Cluster-weighted aggregation for single-cell mode.
//!
//! Instead of streaming raw cells, a selection is reduced to how many of its cells fall in
//! each cluster. The per-gene mean is then the membership-weighted average of the cluster
//! rows of an [`AverageExpression`] matrix. This approximates the cell-level mean under the
//! assumption that every cell of a cluster expresses the cluster average.

use std::collections::HashMap;

use rayon::iter::{IndexedParallelIterator, IntoParallelRefMutIterator, ParallelIterator};
use serde::{Deserialize, Serialize};

use crate::data::{AverageExpression, NumericMatrixSource, RowFilter};
use crate::error::{DiffExprError, Result};
use crate::result::ClusterExclusions;

/// One labeled group of rows of the main dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub name: String,
    pub indices: Vec<usize>,
}

impl Cluster {
    pub fn new(name: impl Into<String>, indices: Vec<usize>) -> Self {
        Cluster {
            name: name.into(),
            indices,
        }
    }
}

/// Maps every row of the main dataset to its cluster label, if it has one.
#[derive(Debug, Clone)]
pub struct ClusterAssignment {
    labels: Vec<String>,
    row_labels: Vec<Option<usize>>,
}

impl ClusterAssignment {
    /// Build the row -> label map from a labeled partition of `num_rows` rows.
    ///
    /// Clusters sharing a name are merged. Indices outside `0..num_rows` are skipped; a row
    /// listed in several clusters keeps the last one. Both cases are logged.
    pub fn from_clusters(clusters: &[Cluster], num_rows: usize) -> Result<Self> {
        if clusters.is_empty() {
            return Err(DiffExprError::EmptyData {
                reason: "No clusters in the label dataset".to_string(),
            });
        }

        let mut labels: Vec<String> = Vec::new();
        let mut label_ids: HashMap<&str, usize> = HashMap::new();
        let mut row_labels = vec![None; num_rows];
        let mut out_of_range = 0usize;
        let mut reassigned = 0usize;

        for cluster in clusters {
            let label = *label_ids.entry(cluster.name.as_str()).or_insert_with(|| {
                labels.push(cluster.name.clone());
                labels.len() - 1
            });

            for &row in &cluster.indices {
                match row_labels.get_mut(row) {
                    Some(slot) => {
                        if slot.is_some_and(|previous| previous != label) {
                            reassigned += 1;
                        }
                        *slot = Some(label);
                    }
                    None => out_of_range += 1,
                }
            }
        }

        if out_of_range > 0 {
            log::warn!(
                "Skipped {} cluster member indices outside the {} rows of the dataset",
                out_of_range,
                num_rows
            );
        }
        if reassigned > 0 {
            log::warn!("{} rows belong to more than one cluster, keeping the last label", reassigned);
        }

        Ok(ClusterAssignment { labels, row_labels })
    }

    pub fn num_rows(&self) -> usize {
        self.row_labels.len()
    }

    /// Distinct labels in first-seen order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn label_of(&self, row: usize) -> Option<&str> {
        self.row_labels
            .get(row)
            .copied()
            .flatten()
            .map(|label| self.labels[label].as_str())
    }

    /// Rows carrying each label, indexed like [`labels`](Self::labels).
    pub fn cluster_indices(&self) -> Vec<Vec<usize>> {
        let mut indices = vec![Vec::new(); self.labels.len()];
        for (row, label) in self.row_labels.iter().enumerate() {
            if let Some(label) = label {
                indices[*label].push(row);
            }
        }
        indices
    }
}

/// How the rows of a selection distribute over the clusters of an average-expression matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelDistribution {
    /// Matrix rows of the clusters present in the selection, in matrix row order.
    pub cluster_rows: Vec<usize>,
    /// Number of selected rows per entry of `cluster_rows`.
    pub counts: Vec<f64>,
    /// Labels in the selection without a row in the matrix.
    pub dropped_labels: usize,
    /// Selected rows belonging to a dropped label.
    pub dropped_rows: usize,
    /// Selected rows without any label.
    pub unassigned_rows: usize,
}

impl LabelDistribution {
    /// Selected rows that did not contribute to the weighted average.
    pub fn exclusions(&self) -> ClusterExclusions {
        ClusterExclusions {
            dropped_labels: self.dropped_labels,
            dropped_rows: self.dropped_rows,
            unassigned_rows: self.unassigned_rows,
        }
    }

    pub fn total_count(&self) -> f64 {
        self.counts.iter().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.cluster_rows.is_empty()
    }
}

/// Tally the cluster labels of the rows in `indices` and match them to matrix rows by name.
pub fn count_label_distribution(
    indices: &[usize],
    assignment: &ClusterAssignment,
    expression: &AverageExpression,
) -> Result<LabelDistribution> {
    let num_rows = assignment.num_rows();
    let mut label_counts = vec![0usize; assignment.labels().len()];
    let mut unassigned_rows = 0usize;

    for &row in indices {
        match assignment.row_labels.get(row) {
            Some(Some(label)) => label_counts[*label] += 1,
            Some(None) => unassigned_rows += 1,
            None => return Err(DiffExprError::IndexOutOfBounds { index: row, num_rows }),
        }
    }

    let mut matched: Vec<(usize, usize)> = Vec::new();
    let mut dropped_labels = 0usize;
    let mut dropped_rows = 0usize;

    for (label, &count) in label_counts.iter().enumerate() {
        if count == 0 {
            continue;
        }
        match expression.cluster_row(&assignment.labels()[label]) {
            Some(matrix_row) => matched.push((matrix_row, count)),
            None => {
                dropped_labels += 1;
                dropped_rows += count;
            }
        }
    }

    if dropped_labels > 0 {
        log::warn!(
            "{} clusters ({} cells) of the selection are missing from the average expression matrix and were excluded",
            dropped_labels,
            dropped_rows
        );
    }

    matched.sort_unstable_by_key(|&(matrix_row, _)| matrix_row);
    let (cluster_rows, counts) = matched
        .into_iter()
        .map(|(matrix_row, count)| (matrix_row, count as f64))
        .unzip();

    Ok(LabelDistribution {
        cluster_rows,
        counts,
        dropped_labels,
        dropped_rows,
        unassigned_rows,
    })
}

/// Membership-weighted average of the matrix rows in `distribution`, one value per gene.
///
/// Each row contributes with weight `count / total`, so a selection that maps onto a single
/// cluster reproduces that cluster's row exactly. Returns `None` when the total count is
/// zero.
pub fn sum_and_average(
    distribution: &LabelDistribution,
    expression: &AverageExpression,
) -> Option<Vec<f64>> {
    let total = distribution.total_count();
    if total <= 0.0 {
        return None;
    }

    let mut weights = vec![0.0; expression.num_clusters()];
    for (&row, &count) in distribution.cluster_rows.iter().zip(&distribution.counts) {
        weights[row] = count / total;
    }

    let mut mean = vec![0.0; expression.num_genes()];
    expression.dataset().for_each_cell(
        RowFilter::Subset(&distribution.cluster_rows),
        |row, gene, value| mean[gene] += value * weights[row],
    );

    Some(mean)
}

/// [`sum_and_average`] for several selections at once, one result per distribution.
pub fn sum_and_average_all(
    distributions: &[LabelDistribution],
    expression: &AverageExpression,
) -> Vec<Option<Vec<f64>>> {
    let mut results = vec![None; distributions.len()];
    results
        .par_iter_mut()
        .enumerate()
        .for_each(|(i, slot)| *slot = sum_and_average(&distributions[i], expression));
    results
}
