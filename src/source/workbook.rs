use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto};

use crate::error::SourceError;
use crate::models::RawTable;
use crate::source::tidy_rows;

/// Read one worksheet (the first when `sheet` is `None`) of an xlsx/xlsm/xlsb/xls/ods file.
pub fn read_workbook(path: &Path, sheet: Option<&str>) -> Result<RawTable, SourceError> {
    let label = path.display().to_string();
    let wb_err = |reason: String| SourceError::Workbook {
        path: label.clone(),
        reason,
    };

    let mut workbook =
        open_workbook_auto(path).map_err(|e| wb_err(format!("failed to open: {}", e)))?;
    let sheet_names = workbook.sheet_names().to_vec();
    let name = match sheet {
        Some(want) => sheet_names
            .iter()
            .find(|n| n.as_str() == want)
            .cloned()
            .ok_or_else(|| {
                wb_err(format!(
                    "sheet '{}' not found (available: {})",
                    want,
                    sheet_names.join(", ")
                ))
            })?,
        None => sheet_names
            .first()
            .cloned()
            .ok_or_else(|| wb_err("workbook contains no sheets".to_string()))?,
    };

    let range = workbook
        .worksheet_range(&name)
        .map_err(|e| wb_err(format!("failed to read sheet '{}': {}", name, e)))?;

    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Err(SourceError::Empty { path: label });
    };
    let headers: Vec<String> = header_row.iter().map(cell_to_string).collect();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(SourceError::Empty { path: label });
    }
    let body: Vec<Vec<String>> = rows
        .map(|r| r.iter().map(cell_to_string).collect())
        .collect();
    log::debug!("{}: read sheet '{}'", label, name);
    let width = headers.len();
    Ok(RawTable::new(headers, tidy_rows(width, body)))
}

/// Render a cell the way a string-typed spreadsheet read would see it.
pub fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(n) => {
            // integers without decimals
            if n.fract() == 0.0 && n.abs() < 1e15 {
                format!("{}", *n as i64)
            } else {
                format!("{}", n)
            }
        }
        Data::Int(n) => n.to_string(),
        Data::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        Data::Error(e) => format!("#{:?}", e),
        // as_datetime honours the workbook's 1904 date system
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default(),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{ExcelDateTime, ExcelDateTimeType};
    use rust_xlsxwriter::{Format, Workbook};

    #[test]
    fn date_cells_follow_the_workbook_date_system() {
        let d1900 = Data::DateTime(ExcelDateTime::new(32994.0, ExcelDateTimeType::DateTime, false));
        assert_eq!(cell_to_string(&d1900), "1990-05-01 00:00:00");
        let noon = Data::DateTime(ExcelDateTime::new(32994.5, ExcelDateTimeType::DateTime, false));
        assert_eq!(cell_to_string(&noon), "1990-05-01 12:00:00");
        // same calendar day, stored relative to 1904-01-01
        let d1904 = Data::DateTime(ExcelDateTime::new(31532.0, ExcelDateTimeType::DateTime, true));
        assert_eq!(cell_to_string(&d1904), "1990-05-01 00:00:00");
    }

    #[test]
    fn numbers_render_like_text() {
        assert_eq!(cell_to_string(&Data::Float(501.0)), "501");
        assert_eq!(cell_to_string(&Data::Float(1.5)), "1.5");
        assert_eq!(cell_to_string(&Data::Int(7)), "7");
        assert_eq!(cell_to_string(&Data::Bool(true)), "TRUE");
        assert_eq!(cell_to_string(&Data::Empty), "");
    }

    #[test]
    fn reads_written_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hay.xlsx");
        let mut wb = Workbook::new();
        let ws = wb.add_worksheet();
        ws.set_name("People").unwrap();
        let date_fmt = Format::new().set_num_format("yyyy-mm-dd");
        ws.write_string(0, 0, "First Name").unwrap();
        ws.write_string(0, 1, "Last Name").unwrap();
        ws.write_string(0, 2, "Date of Birth").unwrap();
        ws.write_string(0, 3, "Case").unwrap();
        ws.write_string(1, 0, "Jon").unwrap();
        ws.write_string(1, 1, "Smith").unwrap();
        ws.write_number_with_format(1, 2, 32994.0, &date_fmt).unwrap();
        ws.write_number(1, 3, 42.0).unwrap();
        wb.save(&path).unwrap();

        let t = read_workbook(&path, None).unwrap();
        assert_eq!(t.headers, vec!["First Name", "Last Name", "Date of Birth", "Case"]);
        assert_eq!(t.rows.len(), 1);
        assert_eq!(t.rows[0][0], "Jon");
        assert_eq!(t.rows[0][2], "1990-05-01 00:00:00");
        assert_eq!(t.rows[0][3], "42");

        let named = read_workbook(&path, Some("People")).unwrap();
        assert_eq!(named, t);
        assert!(matches!(
            read_workbook(&path, Some("Nope")),
            Err(SourceError::Workbook { .. })
        ));
    }
}
