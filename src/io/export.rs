//! CSV export of result tables.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::error::{DiffExprError, Result};
use crate::result::{COLUMN_NAMES, ResultColumn, ResultTable};

/// Write `table` as CSV: a header row followed by one line per dimension.
pub fn write_result_csv<W: Write>(table: &ResultTable, writer: W) -> Result<()> {
    let mut csv_writer = csv::WriterBuilder::new().delimiter(b',').from_writer(writer);

    csv_writer.write_record(COLUMN_NAMES)?;
    for row in table.rows() {
        csv_writer.write_record(ResultColumn::ALL.iter().map(|&column| row.cell(column).to_string()))?;
    }

    csv_writer.flush().map_err(|e| DiffExprError::Csv(e.into()))?;
    Ok(())
}

/// Save `table` as a CSV file at `path`.
pub fn save_result_csv<P: AsRef<Path>>(table: &ResultTable, path: P) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|source| DiffExprError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    write_result_csv(table, file)?;
    log::info!("Saved {} result rows to {}", table.len(), path.display());
    Ok(())
}
