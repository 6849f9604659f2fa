use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;

use crate::error::SourceError;
use crate::models::RawTable;
use crate::source::tidy_rows;

pub fn read_delimited_path(path: &Path, delimiter: u8) -> Result<RawTable, SourceError> {
    let label = path.display().to_string();
    let file = std::fs::File::open(path).map_err(|source| SourceError::Io {
        path: label.clone(),
        source,
    })?;
    read_delimited(file, delimiter, &label)
}

/// Read a delimited stream whose first record is the header. Every cell stays a string.
pub fn read_delimited<R: Read>(
    reader: R,
    delimiter: u8,
    label: &str,
) -> Result<RawTable, SourceError> {
    let csv_err = |source: csv::Error| SourceError::Csv {
        path: label.to_string(),
        source,
    };
    let mut rdr = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(str::to_string)
        .collect();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(SourceError::Empty {
            path: label.to_string(),
        });
    }

    let mut rows = Vec::new();
    for rec in rdr.records() {
        let rec = rec.map_err(csv_err)?;
        rows.push(rec.iter().map(str::to_string).collect());
    }
    let width = headers.len();
    Ok(RawTable::new(headers, tidy_rows(width, rows)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_quoted_fields_and_keeps_strings() {
        let data = "FIRST NAME,LAST NAME,DATE OF BIRTH,ZIP\n\"Smith, Jr\",Jon,05/01/1990,00501\n";
        let t = read_delimited(data.as_bytes(), b',', "mem").unwrap();
        assert_eq!(t.headers, vec!["FIRST NAME", "LAST NAME", "DATE OF BIRTH", "ZIP"]);
        assert_eq!(t.rows[0], vec!["Smith, Jr", "Jon", "05/01/1990", "00501"]);
    }

    #[test]
    fn tab_delimited() {
        let data = "FIRST NAME\tLAST NAME\tDATE OF BIRTH\nA\tB\t2000-01-01\n";
        let t = read_delimited(data.as_bytes(), b'\t', "mem").unwrap();
        assert_eq!(t.rows[0][2], "2000-01-01");
    }

    #[test]
    fn ragged_rows_are_padded() {
        let data = "FIRST NAME,LAST NAME,DATE OF BIRTH\nA,B\n\n,,\nC,D,2000-01-01\n";
        let t = read_delimited(data.as_bytes(), b',', "mem").unwrap();
        assert_eq!(t.rows.len(), 2);
        assert_eq!(t.rows[0], vec!["A", "B", ""]);
    }

    #[test]
    fn empty_input_is_an_error() {
        let err = read_delimited("".as_bytes(), b',', "empty.csv").unwrap_err();
        assert!(matches!(err, SourceError::Empty { .. }));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = read_delimited_path(Path::new("/definitely/not/here.csv"), b',').unwrap_err();
        assert!(matches!(err, SourceError::Io { .. }));
    }
}
