//! Lead list reader.
//!
//! The lead list is a CSV export with a header row. Only the profile URL
//! column is read; every other column is ignored.

use std::io::Read;
use std::path::Path;

use tracing::{info, warn};

use leadrefresh_shared::{InputRecord, RefreshError, Result};

/// Read all records from the CSV file at `path`.
pub fn read_records(path: &Path, url_column: &str) -> Result<Vec<InputRecord>> {
    let file = std::fs::File::open(path).map_err(|e| RefreshError::io(path, e))?;
    let records = read_records_from(file, url_column)?;
    info!(path = %path.display(), records = records.len(), "lead list loaded");
    Ok(records)
}

/// Read all records from any CSV source, in row order.
///
/// Rows whose URL cell is blank are skipped with a warning.
pub fn read_records_from<R: Read>(reader: R, url_column: &str) -> Result<Vec<InputRecord>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|e| RefreshError::input(format!("cannot read header row: {e}")))?;
    let column = headers
        .iter()
        .position(|h| h == url_column)
        .ok_or_else(|| RefreshError::input(format!("missing column '{url_column}'")))?;

    let mut records = Vec::new();
    for (i, row) in csv_reader.records().enumerate() {
        let row = row.map_err(|e| RefreshError::input(format!("row {}: {e}", i + 2)))?;
        match row.get(column).filter(|cell| !cell.is_empty()) {
            Some(url) => records.push(InputRecord::new(url)),
            None => warn!(line = i + 2, "row has no profile URL, skipping"),
        }
    }

    Ok(records)
}
