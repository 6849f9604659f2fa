use std::path::Path;

use rust_xlsxwriter::{Color, Format, FormatAlign, Workbook, Worksheet, XlsxError};

use crate::error::ExportError;
use crate::export::{ExportInput, MATCHES_SHEET, SUMMARY_SHEET, ensure_parent_dir};
use crate::models::{SUMMARY_HEADERS, SearchSummary};

fn header_format() -> Format {
    Format::new().set_bold().set_align(FormatAlign::Center)
}

fn row_format_even() -> Format {
    Format::new().set_background_color(Color::RGB(0xF2F2F2))
}

fn write_headers<S: AsRef<str>>(ws: &mut Worksheet, headers: &[S]) -> Result<(), XlsxError> {
    let hfmt = header_format();
    for (c, h) in headers.iter().enumerate() {
        ws.write_string_with_format(0, c as u16, h.as_ref(), &hfmt)?;
    }
    Ok(())
}

/// Exact-match haystack rows, one per accepted candidate, in the haystack's column order.
fn write_matches_sheet(ws: &mut Worksheet, input: &ExportInput<'_>) -> Result<(), XlsxError> {
    write_headers(ws, &input.haystack.headers)?;
    let even = row_format_even();
    for (i, row) in input.match_rows().enumerate() {
        let r = (i + 1) as u32;
        if i % 2 == 0 {
            ws.set_row_format(r, &even)?;
        }
        for (c, v) in row.iter().enumerate() {
            ws.write_string(r, c as u16, v)?;
        }
    }
    Ok(())
}

fn write_summary_sheet(ws: &mut Worksheet, summary: &SearchSummary) -> Result<(), XlsxError> {
    write_headers(ws, &SUMMARY_HEADERS)?;
    let even = row_format_even();
    for (i, s) in summary.rows.iter().enumerate() {
        let r = (i + 1) as u32;
        if i % 2 == 0 {
            ws.set_row_format(r, &even)?;
        }
        ws.write_string(r, 0, &s.first_name)?;
        ws.write_string(r, 1, &s.last_name)?;
        ws.write_string(r, 2, &s.date_of_birth)?;
        ws.write_number(r, 3, s.dob_match_count as f64)?;
        ws.write_number(r, 4, s.exact_match_count as f64)?;
    }
    ws.set_column_width(0, 18)?;
    ws.set_column_width(1, 18)?;
    ws.set_column_width(2, 14)?;
    ws.set_column_width(3, 17)?;
    ws.set_column_width(4, 19)?;
    Ok(())
}

fn build_workbook(path: &Path, input: &ExportInput<'_>) -> Result<(), XlsxError> {
    let mut workbook = Workbook::new();

    let matches = workbook.add_worksheet();
    matches.set_name(MATCHES_SHEET)?;
    write_matches_sheet(matches, input)?;

    let summary = workbook.add_worksheet();
    summary.set_name(SUMMARY_SHEET)?;
    write_summary_sheet(summary, &input.outcome.summary)?;

    workbook.save(path)?;
    Ok(())
}

/// Write the `Matches` and `Summary` sheets. Both are always present; an empty
/// outcome leaves them with headers only.
pub fn export_to_xlsx(path: &Path, input: &ExportInput<'_>) -> Result<(), ExportError> {
    ensure_parent_dir(path).map_err(|e| ExportError::Xlsx(e.to_string()))?;
    build_workbook(path, input)
        .map_err(|e| ExportError::Xlsx(format!("{}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::fixtures::fixture;
    use crate::source::workbook::read_workbook;

    #[test]
    fn writes_both_sheets() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested").join("res.xlsx");
        let f = fixture();
        export_to_xlsx(&out, &f.input()).unwrap();
        assert!(std::fs::metadata(&out).unwrap().len() > 0);

        let matches = read_workbook(&out, Some(MATCHES_SHEET)).unwrap();
        assert_eq!(
            matches.headers,
            vec!["ID", "FIRST NAME", "LAST NAME", "DATE OF BIRTH", "CITY"]
        );
        assert_eq!(matches.rows, vec![vec!["1", "JON", "SMITH", "1990-05-01", "Reno"]]);

        let summary = read_workbook(&out, Some(SUMMARY_SHEET)).unwrap();
        assert_eq!(summary.headers, SUMMARY_HEADERS.to_vec());
        assert_eq!(summary.rows.len(), 2);
        assert_eq!(summary.rows[0], vec!["JOHN", "SMITH", "1990-05-01", "2", "1"]);
        assert_eq!(summary.rows[1], vec!["NOBODY", "HERE", "", "0", "0"]);
    }

    #[test]
    fn empty_outcome_keeps_headers() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("empty.xlsx");
        let mut f = fixture();
        f.outcome = Default::default();
        export_to_xlsx(&out, &f.input()).unwrap();
        let matches = read_workbook(&out, Some(MATCHES_SHEET)).unwrap();
        assert!(matches.rows.is_empty());
        assert_eq!(matches.headers.len(), 5);
        let summary = read_workbook(&out, Some(SUMMARY_SHEET)).unwrap();
        assert!(summary.rows.is_empty());
    }
}
