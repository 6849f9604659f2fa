//! Input adapters: turn a file on disk into a string-typed [`RawTable`].

pub mod delimited;
pub mod workbook;

use std::path::Path;

use crate::error::SourceError;
use crate::models::RawTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Tsv,
    Workbook,
}

impl SourceFormat {
    pub fn from_path(path: &Path) -> Result<Self, SourceError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "csv" | "txt" => Ok(Self::Csv),
            "tsv" | "tab" => Ok(Self::Tsv),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Ok(Self::Workbook),
            _ => Err(SourceError::UnsupportedFormat {
                path: path.display().to_string(),
            }),
        }
    }
}

/// Load a table, choosing the reader from the file extension. `sheet` selects a
/// worksheet for workbook inputs (first sheet when `None`) and is ignored otherwise.
pub fn load_table(path: &Path, sheet: Option<&str>) -> Result<RawTable, SourceError> {
    let table = match SourceFormat::from_path(path)? {
        SourceFormat::Csv => delimited::read_delimited_path(path, b',')?,
        SourceFormat::Tsv => delimited::read_delimited_path(path, b'\t')?,
        SourceFormat::Workbook => workbook::read_workbook(path, sheet)?,
    };
    log::info!(
        "Loaded {}: {} columns, {} rows",
        path.display(),
        table.headers.len(),
        table.rows.len()
    );
    Ok(table)
}

/// Pad short rows to the header width and drop rows with no content at all.
pub(crate) fn tidy_rows(width: usize, rows: Vec<Vec<String>>) -> Vec<Vec<String>> {
    rows.into_iter()
        .filter(|r| r.iter().any(|c| !c.trim().is_empty()))
        .map(|mut r| {
            if r.len() < width {
                r.resize(width, String::new());
            }
            r
        })
        .collect()
}
