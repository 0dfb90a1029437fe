//! Differential statistics between two selections.
//!
//! [`compute_differential_expression`] is a pure function of its inputs: it reads the dataset,
//! optionally fetches (and persists) per-dimension ranges for normalization, and returns a fresh
//! [`ResultTable`]. [`DiffExprSession`] wraps it with the selection / staleness bookkeeping of an
//! interactive view.
//!
//! Two aggregation modes exist:
//!
//! - **Bulk**: every selected row is streamed, giving exact means and medians
//! - **Single-cell**: each selection is reduced to per-cluster cell counts and the means are
//!   membership-weighted averages over an [`AverageExpression`] matrix; medians are not available

use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};
use single_utilities::traits::FloatOpsTS;

use crate::config::DiffExprConfig;
use crate::data::{AverageExpression, NumericMatrixSource, validate_row_indices};
use crate::error::{DiffExprError, Result};
use crate::progress::ProgressReporter;
use crate::result::{ResultRow, ResultTable};
use crate::selection::Selection;
use crate::statistics::aggregate::accumulate;
use crate::statistics::cluster::{ClusterAssignment, count_label_distribution, sum_and_average_all};
use crate::statistics::range::{DimensionRangeCache, DimensionStatistics};
use crate::statistics::{fround, selection_median};

mod session;

pub use session::{ComputeState, DiffExprSession};

pub const SELECTION_A: &str = "A";
pub const SELECTION_B: &str = "B";

/// How per-dimension means are obtained.
#[derive(Debug)]
pub enum AggregationMode<'a> {
    Bulk,
    SingleCell {
        expression: &'a mut AverageExpression,
        assignment: &'a ClusterAssignment,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComputeOptions {
    pub normalize: bool,
    pub decimals: u32,
    pub min_dimensions_per_task: usize,
}

impl Default for ComputeOptions {
    fn default() -> Self {
        ComputeOptions::from(&DiffExprConfig::default())
    }
}

impl From<&DiffExprConfig> for ComputeOptions {
    fn from(config: &DiffExprConfig) -> Self {
        ComputeOptions {
            normalize: config.normalize,
            decimals: config.decimals,
            min_dimensions_per_task: config.min_dimensions_per_task.max(1),
        }
    }
}

/// Compute per-dimension means, medians and difference scores between two selections.
///
/// Both selections must be non-empty. When `options.normalize` is set, means and medians are
/// min-max normalized with the ranges of the dataset the dimensions come from (the main dataset
/// in bulk mode, the average-expression matrix in single-cell mode); those ranges are taken from
/// `ranges` and persisted into that dataset's property store on first use.
pub fn compute_differential_expression<T, S>(
    dataset: &mut S,
    selection_a: &Selection,
    selection_b: &Selection,
    mode: AggregationMode<'_>,
    options: &ComputeOptions,
    ranges: &mut DimensionRangeCache,
    progress: &dyn ProgressReporter,
) -> Result<ResultTable>
where
    T: FloatOpsTS,
    S: NumericMatrixSource<T>,
{
    ensure_not_empty(selection_a, SELECTION_A)?;
    ensure_not_empty(selection_b, SELECTION_B)?;

    progress.start(selection_a.len() + selection_b.len());
    let table = match mode {
        AggregationMode::Bulk => {
            compute_bulk(dataset, selection_a, selection_b, options, ranges, progress)
        }
        AggregationMode::SingleCell {
            expression,
            assignment,
        } => check_single_cell_rows(dataset, assignment, selection_a, selection_b).and_then(
            |()| {
                compute_single_cell(
                    expression,
                    assignment,
                    selection_a,
                    selection_b,
                    options,
                    ranges,
                    progress,
                )
            },
        ),
    };
    progress.finish();

    let table = table?;
    log::info!(
        "Computed differential expression for {} dimensions ({} vs {} rows)",
        table.len(),
        selection_a.len(),
        selection_b.len()
    );
    Ok(table)
}

fn ensure_not_empty(selection: &Selection, name: &str) -> Result<()> {
    if selection.is_empty() {
        return Err(DiffExprError::EmptySelection {
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Single-cell mode reads labels, not cells, but the selections and the cluster assignment must
/// still address rows of the main dataset.
fn check_single_cell_rows<T, S>(
    dataset: &S,
    assignment: &ClusterAssignment,
    selection_a: &Selection,
    selection_b: &Selection,
) -> Result<()>
where
    T: FloatOpsTS,
    S: NumericMatrixSource<T>,
{
    if assignment.num_rows() != dataset.num_rows() {
        return Err(DiffExprError::DimensionMismatch {
            expected: dataset.num_rows(),
            got: assignment.num_rows(),
        });
    }
    validate_row_indices(dataset, selection_a.indices())?;
    validate_row_indices(dataset, selection_b.indices())
}

fn compute_bulk<T, S>(
    dataset: &mut S,
    selection_a: &Selection,
    selection_b: &Selection,
    options: &ComputeOptions,
    ranges: &mut DimensionRangeCache,
    progress: &dyn ProgressReporter,
) -> Result<ResultTable>
where
    T: FloatOpsTS,
    S: NumericMatrixSource<T>,
{
    let stats = options.normalize.then(|| ranges.get_or_compute(dataset));

    let dataset: &S = dataset;
    log::debug!(
        "Aggregating {} and {} rows over {} dimensions",
        selection_a.len(),
        selection_b.len(),
        dataset.num_columns()
    );

    let (aggregate_a, aggregate_b) = rayon::join(
        || accumulate(dataset, selection_a.indices(), progress),
        || accumulate(dataset, selection_b.indices(), progress),
    );
    let (rows_a, sum_a, values_a) = aggregate_a?.into_parts();
    let (rows_b, sum_b, values_b) = aggregate_b?.into_parts();

    let names = dataset.column_names();
    let (n_a, n_b) = (rows_a as f64, rows_b as f64);

    let rows = values_a
        .into_par_iter()
        .zip(values_b.into_par_iter())
        .enumerate()
        .with_min_len(options.min_dimensions_per_task)
        .map(|(dim, (mut column_a, mut column_b))| {
            let mean_a = sum_a[dim] / n_a;
            let mean_b = sum_b[dim] / n_b;
            let median_a = selection_median(&mut column_a);
            let median_b = selection_median(&mut column_b);
            build_row(
                &names[dim],
                dim,
                (mean_a, mean_b),
                (median_a, median_b),
                stats.as_ref(),
                options.decimals,
            )
        })
        .collect();

    Ok(ResultTable::new(rows))
}

fn compute_single_cell(
    expression: &mut AverageExpression,
    assignment: &ClusterAssignment,
    selection_a: &Selection,
    selection_b: &Selection,
    options: &ComputeOptions,
    ranges: &mut DimensionRangeCache,
    progress: &dyn ProgressReporter,
) -> Result<ResultTable> {
    let stats = options
        .normalize
        .then(|| ranges.get_or_compute(expression.dataset_mut()));
    let expression: &AverageExpression = expression;

    let distribution_a = count_label_distribution(selection_a.indices(), assignment, expression)?;
    progress.advance(selection_a.len());
    let distribution_b = count_label_distribution(selection_b.indices(), assignment, expression)?;
    progress.advance(selection_b.len());
    let exclusions = (distribution_a.exclusions(), distribution_b.exclusions());

    let mut means = sum_and_average_all(&[distribution_a, distribution_b], expression).into_iter();
    let no_match = |name: &str| DiffExprError::NoMatchingClusters {
        name: name.to_string(),
    };
    let means_a = means.next().flatten().ok_or_else(|| no_match(SELECTION_A))?;
    let means_b = means.next().flatten().ok_or_else(|| no_match(SELECTION_B))?;

    let names = expression.gene_names();
    let rows = (0..expression.num_genes())
        .into_par_iter()
        .with_min_len(options.min_dimensions_per_task)
        .map(|dim| {
            build_row(
                &names[dim],
                dim,
                (means_a[dim], means_b[dim]),
                (None, None),
                stats.as_ref(),
                options.decimals,
            )
        })
        .collect();

    Ok(ResultTable::new(rows).with_exclusions(exclusions.0, exclusions.1))
}

fn build_row(
    name: &str,
    dim: usize,
    (mean_a, mean_b): (f64, f64),
    (median_a, median_b): (Option<f64>, Option<f64>),
    stats: Option<&DimensionStatistics>,
    decimals: u32,
) -> ResultRow {
    let scale = |value: f64| match stats {
        Some(stats) => stats.normalize(dim, value),
        None => value,
    };

    let mean_a = scale(mean_a);
    let mean_b = scale(mean_b);

    ResultRow {
        dimension_name: name.to_string(),
        difference: fround((mean_a - mean_b).abs(), decimals),
        mean_a,
        mean_b,
        median_a: median_a.map(scale),
        median_b: median_b.map(scale),
    }
}
