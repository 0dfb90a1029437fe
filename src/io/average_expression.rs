//! Loading of cluster × gene average expression tables.
//!
//! Expected format (comma separated):
//!
//! ```text
//! ,CD3E,MS4A1,NKG7
//! T cells,4.1,0.2,1.3
//! B cells,0.3,5.9,0.0
//! ```
//!
//! The first header cell is ignored. Repeated gene names get a `_copy{n}` suffix so every
//! column stays addressable by name.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use ndarray::Array2;

use crate::data::AverageExpression;
use crate::error::{DiffExprError, Result};

/// Recoverable problems found while parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Cells that did not parse as a number and were replaced by `0.0`.
    pub malformed_cells: usize,
    /// Rows with fewer values than genes, padded with `0.0`.
    pub short_rows: usize,
    /// Rows with more values than genes, truncated.
    pub long_rows: usize,
    /// Gene names renamed because they were already taken.
    pub renamed_genes: usize,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        *self == LoadReport::default()
    }
}

/// Read an average expression table from `path`.
///
/// Nothing is returned unless the whole file was read; malformed cells are zero-filled.
pub fn load_average_expression<P: AsRef<Path>>(path: P) -> Result<(AverageExpression, LoadReport)> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| DiffExprError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let (expression, report) = read_average_expression(file)?;
    log::info!(
        "Loaded average expression of {} clusters x {} genes from {}",
        expression.num_clusters(),
        expression.num_genes(),
        path.display()
    );
    Ok((expression, report))
}

/// Parse an average expression table from any reader.
pub fn read_average_expression<R: Read>(reader: R) -> Result<(AverageExpression, LoadReport)> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records = csv_reader.records();
    let header = records.next().ok_or_else(|| DiffExprError::EmptyData {
        reason: "Average expression table has no header".to_string(),
    })??;

    let mut report = LoadReport::default();
    let raw_genes: Vec<String> = header.iter().skip(1).map(str::to_string).collect();
    let (gene_names, renamed) = disambiguate_names(raw_genes);
    report.renamed_genes = renamed;
    let n_genes = gene_names.len();

    let mut cluster_names = Vec::new();
    let mut values = Vec::new();

    for record in records {
        let record = record?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        let line = record.position().map_or(0, |position| position.line());

        let mut cells = record.iter();
        cluster_names.push(cells.next().unwrap_or_default().to_string());

        let row: Vec<&str> = cells.collect();
        if row.len() < n_genes {
            report.short_rows += 1;
            log::warn!(
                "Line {}: {} values for {} genes, padding with zeros",
                line,
                row.len(),
                n_genes
            );
        } else if row.len() > n_genes {
            report.long_rows += 1;
            log::warn!(
                "Line {}: {} values for {} genes, ignoring the extra values",
                line,
                row.len(),
                n_genes
            );
        }

        for gene in 0..n_genes {
            let value = match row.get(gene) {
                Some(cell) => cell.parse::<f64>().unwrap_or_else(|_| {
                    report.malformed_cells += 1;
                    log::warn!(
                        "Line {}: could not parse '{}' for gene {} as a number, using 0",
                        line,
                        cell,
                        gene_names[gene]
                    );
                    0.0
                }),
                None => 0.0,
            };
            values.push(value);
        }
    }

    if !report.is_clean() {
        log::warn!("Average expression table loaded with recoverable problems: {:?}", report);
    }

    let matrix = Array2::from_shape_vec((cluster_names.len(), n_genes), values).map_err(|e| {
        DiffExprError::InvalidInput {
            reason: format!("Could not shape average expression matrix: {}", e),
        }
    })?;

    Ok((AverageExpression::new(cluster_names, gene_names, matrix)?, report))
}

/// Suffix repeated names with `_copy{n}`, counting from 1 for the second occurrence.
///
/// Returns the new names and how many were renamed.
pub fn disambiguate_names(names: Vec<String>) -> (Vec<String>, usize) {
    let mut occurrences: HashMap<String, usize> = HashMap::with_capacity(names.len());
    let mut renamed = 0;

    let unique = names
        .into_iter()
        .map(|name| {
            let seen = occurrences.entry(name.clone()).or_insert(0);
            *seen += 1;
            if *seen == 1 {
                name
            } else {
                renamed += 1;
                format!("{}_copy{}", name, *seen - 1)
            }
        })
        .collect();

    (unique, renamed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::NumericMatrixSource;
    use std::io::Write;

    const TABLE: &str = ",CD3E,MS4A1,NKG7\nT cells,4.5,0.25,1\nB cells,0.5,6,0\n";

    #[test]
    fn test_read_table() {
        let (expression, report) = read_average_expression(TABLE.as_bytes()).unwrap();
        assert!(report.is_clean());
        assert_eq!(expression.cluster_names(), &["T cells", "B cells"]);
        assert_eq!(expression.gene_names(), &["CD3E", "MS4A1", "NKG7"]);
        assert_eq!(expression.cluster_row("B cells"), Some(1));
        assert_eq!(expression.dataset().get(0, 1), Some(0.25));
        assert_eq!(expression.dataset().get(1, 1), Some(6.0));
    }

    #[test]
    fn test_malformed_cells_are_zero_filled() {
        let table = ",g1,g2,g3\nc1,1.0,oops,3.0\nc2,4.0\n\nc3,1,2,3,4\n";
        let (expression, report) = read_average_expression(table.as_bytes()).unwrap();

        assert_eq!(report.malformed_cells, 1);
        assert_eq!(report.short_rows, 1);
        assert_eq!(report.long_rows, 1);
        assert_eq!(expression.num_clusters(), 3);

        let dataset = expression.dataset();
        assert_eq!(dataset.get(0, 1), Some(0.0));
        assert_eq!(dataset.get(0, 2), Some(3.0));
        assert_eq!(dataset.get(1, 0), Some(4.0));
        assert_eq!(dataset.get(1, 2), Some(0.0));
        assert_eq!(dataset.get(2, 2), Some(3.0));
        assert_eq!(dataset.num_columns(), 3);
    }

    #[test]
    fn test_duplicate_genes_are_renamed() {
        let (names, renamed) = disambiguate_names(
            ["A", "B", "A", "A", "B"].iter().map(|s| s.to_string()).collect(),
        );
        assert_eq!(names, vec!["A", "B", "A_copy1", "A_copy2", "B_copy1"]);
        assert_eq!(renamed, 3);

        let (expression, report) =
            read_average_expression(",TP53,TP53\nc1,1,2\n".as_bytes()).unwrap();
        assert_eq!(expression.gene_names(), &["TP53", "TP53_copy1"]);
        assert_eq!(report.renamed_genes, 1);
    }

    #[test]
    fn test_empty_input_is_an_error() {
        let result = read_average_expression("".as_bytes());
        assert!(matches!(result, Err(DiffExprError::EmptyData { .. })));
    }

    #[test]
    fn test_header_only_gives_no_clusters() {
        let (expression, _) = read_average_expression(",g1,g2\n".as_bytes()).unwrap();
        assert_eq!(expression.num_clusters(), 0);
        assert_eq!(expression.num_genes(), 2);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(TABLE.as_bytes()).unwrap();

        let (expression, _) = load_average_expression(file.path()).unwrap();
        assert_eq!(expression.num_clusters(), 2);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = load_average_expression("/nonexistent/avg_expr.csv");
        assert!(matches!(result, Err(DiffExprError::Io { .. })));
    }
}
