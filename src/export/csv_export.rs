use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use csv::{Writer, WriterBuilder};

use crate::error::ExportError;
use crate::export::{ExportInput, ensure_parent_dir, sibling_path};
use crate::models::{SUMMARY_HEADERS, SearchSummary};

fn open_writer(path: &Path) -> Result<Writer<BufWriter<File>>, ExportError> {
    ensure_parent_dir(path).map_err(|e| ExportError::Csv(e.to_string()))?;
    let file =
        File::create(path).map_err(|e| ExportError::Csv(format!("{}: {}", path.display(), e)))?;
    let buf_writer = BufWriter::with_capacity(512 * 1024, file);
    Ok(WriterBuilder::new().from_writer(buf_writer))
}

fn csv_err(path: &Path) -> impl Fn(csv::Error) -> ExportError + '_ {
    move |e| ExportError::Csv(format!("{}: {}", path.display(), e))
}

pub fn write_matches<W: Write>(w: &mut Writer<W>, input: &ExportInput<'_>) -> csv::Result<()> {
    w.write_record(&input.haystack.headers)?;
    for row in input.match_rows() {
        w.write_record(&row)?;
    }
    w.flush()?;
    Ok(())
}

pub fn write_summary<W: Write>(w: &mut Writer<W>, summary: &SearchSummary) -> csv::Result<()> {
    w.write_record(SUMMARY_HEADERS)?;
    for s in &summary.rows {
        let dob_count = s.dob_match_count.to_string();
        let exact_count = s.exact_match_count.to_string();
        w.write_record([
            s.first_name.as_str(),
            s.last_name.as_str(),
            s.date_of_birth.as_str(),
            dob_count.as_str(),
            exact_count.as_str(),
        ])?;
    }
    w.flush()?;
    Ok(())
}

/// Write `<stem>_matches.csv` and `<stem>_summary.csv` next to `out`.
pub fn export_to_csv(
    out: &Path,
    input: &ExportInput<'_>,
) -> Result<(PathBuf, PathBuf), ExportError> {
    let matches_path = sibling_path(out, "_matches.csv");
    let summary_path = sibling_path(out, "_summary.csv");

    let mut w = open_writer(&matches_path)?;
    write_matches(&mut w, input).map_err(csv_err(&matches_path))?;

    let mut w = open_writer(&summary_path)?;
    write_summary(&mut w, &input.outcome.summary).map_err(csv_err(&summary_path))?;

    Ok((matches_path, summary_path))
}
