//! Result tables of a differential expression computation.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Header labels, in column order.
pub const COLUMN_NAMES: [&str; 6] = [
    "ID",
    "Difference",
    "Mean (A)",
    "Mean (B)",
    "Median (A)",
    "Median (B)",
];

/// Placeholder shown for values a mode does not produce.
pub const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultColumn {
    Id,
    Difference,
    MeanA,
    MeanB,
    MedianA,
    MedianB,
}

impl ResultColumn {
    pub const ALL: [ResultColumn; 6] = [
        ResultColumn::Id,
        ResultColumn::Difference,
        ResultColumn::MeanA,
        ResultColumn::MeanB,
        ResultColumn::MedianA,
        ResultColumn::MedianB,
    ];

    pub fn name(self) -> &'static str {
        COLUMN_NAMES[self as usize]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// A single displayed cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell<'a> {
    Text(&'a str),
    Number(f64),
    NotAvailable,
}

impl Cell<'_> {
    /// Display ordering: `N/A` sorts before everything else, numbers by [`f64::total_cmp`].
    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Cell::NotAvailable, Cell::NotAvailable) => Ordering::Equal,
            (Cell::NotAvailable, _) => Ordering::Less,
            (_, Cell::NotAvailable) => Ordering::Greater,
            (Cell::Number(a), Cell::Number(b)) => a.total_cmp(b),
            (Cell::Text(a), Cell::Text(b)) => a.cmp(b),
            (Cell::Number(_), Cell::Text(_)) => Ordering::Less,
            (Cell::Text(_), Cell::Number(_)) => Ordering::Greater,
        }
    }
}

impl fmt::Display for Cell<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(text) => write!(f, "{}", text),
            Cell::Number(value) => write!(f, "{}", value),
            Cell::NotAvailable => write!(f, "{}", NOT_AVAILABLE),
        }
    }
}

/// Statistics of one dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    pub dimension_name: String,
    /// `|mean_a - mean_b|`, rounded half-up for display.
    pub difference: f64,
    pub mean_a: f64,
    pub mean_b: f64,
    /// `None` in single-cell mode, where no cell-level values are aggregated.
    pub median_a: Option<f64>,
    pub median_b: Option<f64>,
}

impl ResultRow {
    pub fn cell(&self, column: ResultColumn) -> Cell<'_> {
        let optional = |value: Option<f64>| value.map_or(Cell::NotAvailable, Cell::Number);
        match column {
            ResultColumn::Id => Cell::Text(&self.dimension_name),
            ResultColumn::Difference => Cell::Number(self.difference),
            ResultColumn::MeanA => Cell::Number(self.mean_a),
            ResultColumn::MeanB => Cell::Number(self.mean_b),
            ResultColumn::MedianA => optional(self.median_a),
            ResultColumn::MedianB => optional(self.median_b),
        }
    }
}

/// Immutable snapshot of one computation, one row per dimension in dimension order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultTable {
    rows: Vec<ResultRow>,
    #[serde(default)]
    exclusions: [ClusterExclusions; 2],
}

/// Selected rows of one selection that single-cell mode could not attribute to a cluster row.
///
/// Always zero in bulk mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterExclusions {
    /// Cluster labels present in the selection but missing from the average expression matrix.
    pub dropped_labels: usize,
    /// Selected rows belonging to those labels.
    pub dropped_rows: usize,
    /// Selected rows without any cluster label.
    pub unassigned_rows: usize,
}

impl ClusterExclusions {
    pub fn is_empty(&self) -> bool {
        *self == ClusterExclusions::default()
    }
}

impl ResultTable {
    pub fn new(rows: Vec<ResultRow>) -> Self {
        ResultTable {
            rows,
            exclusions: Default::default(),
        }
    }

    /// Attach the rows each selection lost to unmatched or missing cluster labels.
    pub fn with_exclusions(mut self, a: ClusterExclusions, b: ClusterExclusions) -> Self {
        self.exclusions = [a, b];
        self
    }

    pub fn exclusions_a(&self) -> &ClusterExclusions {
        &self.exclusions[0]
    }

    pub fn exclusions_b(&self) -> &ClusterExclusions {
        &self.exclusions[1]
    }

    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ResultRow> {
        self.rows.get(index)
    }

    pub fn find(&self, dimension_name: &str) -> Option<&ResultRow> {
        self.rows.iter().find(|row| row.dimension_name == dimension_name)
    }

    /// Rows by descending difference; ties keep dimension order.
    pub fn ranked_by_difference(&self) -> Vec<&ResultRow> {
        self.sorted_by(ResultColumn::Difference, SortOrder::Descending)
    }

    /// The `n` rows with the largest difference.
    pub fn top(&self, n: usize) -> Vec<&ResultRow> {
        let mut ranked = self.ranked_by_difference();
        ranked.truncate(n);
        ranked
    }

    /// Rows whose dimension name contains `pattern`, ignoring case. An empty pattern keeps all rows.
    pub fn filter_by_name(&self, pattern: &str) -> Vec<&ResultRow> {
        let pattern = pattern.to_lowercase();
        self.rows
            .iter()
            .filter(|row| pattern.is_empty() || row.dimension_name.to_lowercase().contains(&pattern))
            .collect()
    }

    /// Stable sort on one column. `N/A` cells come first in ascending order.
    pub fn sorted_by(&self, column: ResultColumn, order: SortOrder) -> Vec<&ResultRow> {
        let mut rows: Vec<&ResultRow> = self.rows.iter().collect();
        rows.sort_by(|a, b| {
            let ordering = a.cell(column).compare(&b.cell(column));
            match order {
                SortOrder::Ascending => ordering,
                SortOrder::Descending => ordering.reverse(),
            }
        });
        rows
    }
}
