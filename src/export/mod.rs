//! Writers for batch outcomes: XLSX workbook, CSV pair, JSON audit document.

pub mod csv_export;
pub mod json_export;
pub mod xlsx_export;

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::ExportConfig;
use crate::error::ExportError;
use crate::matching::BatchOutcome;
use crate::models::Dataset;
use crate::orchestrator::summary::RunSummary;

pub const MATCHES_SHEET: &str = "Matches";
pub const SUMMARY_SHEET: &str = "Summary";

/// Everything an exporter needs about one finished batch.
#[derive(Debug, Clone, Copy)]
pub struct ExportInput<'a> {
    pub needles: &'a Dataset,
    pub haystack: &'a Dataset,
    pub outcome: &'a BatchOutcome,
    pub run: &'a RunSummary,
}

impl ExportInput<'_> {
    /// Exact-match haystack rows in query order, flattened to the haystack's columns.
    pub fn match_rows(&self) -> impl Iterator<Item = Vec<String>> + '_ {
        self.outcome
            .results
            .iter()
            .flat_map(|r| r.exact_match_records(self.haystack))
            .map(|rec| self.haystack.export_row(rec))
    }
}

/// Write every file the configured format asks for. Returns the written paths.
pub fn export_outcome(
    cfg: &ExportConfig,
    input: &ExportInput<'_>,
) -> Result<Vec<PathBuf>, ExportError> {
    let out = Path::new(&cfg.out_path);
    let mut written = Vec::new();
    if cfg.format.writes_xlsx() {
        let path = out.with_extension("xlsx");
        xlsx_export::export_to_xlsx(&path, input)?;
        written.push(path);
    }
    if cfg.format.writes_csv() {
        let (m, s) = csv_export::export_to_csv(out, input)?;
        written.push(m);
        written.push(s);
    }
    if cfg.format.writes_json() {
        let path = out.with_extension("json");
        json_export::export_to_json(&path, input)?;
        written.push(path);
    }
    for p in &written {
        log::info!("Wrote {}", p.display());
    }
    Ok(written)
}

/// `<dir>/<stem><suffix>` next to the configured output path.
pub(crate) fn sibling_path(out: &Path, suffix: &str) -> PathBuf {
    let stem = out
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("search_results");
    out.with_file_name(format!("{}{}", stem, suffix))
}

pub(crate) fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::matching::{MatchOptions, run_batch};
    use crate::models::RawTable;
    use crate::normalize::{DateMode, normalize_table};
    use crate::orchestrator::summary::SummaryBuilder;

    pub struct Fixture {
        pub needles: Dataset,
        pub haystack: Dataset,
        pub outcome: BatchOutcome,
        pub run: RunSummary,
    }

    impl Fixture {
        pub fn input(&self) -> ExportInput<'_> {
            ExportInput {
                needles: &self.needles,
                haystack: &self.haystack,
                outcome: &self.outcome,
                run: &self.run,
            }
        }
    }

    fn s(v: &[&str]) -> Vec<String> {
        v.iter().map(|x| x.to_string()).collect()
    }

    pub fn fixture() -> Fixture {
        let hay = RawTable::new(
            s(&["ID", "First Name", "Last Name", "Date of Birth", "City"]),
            vec![
                s(&["1", "Jon", "Smith", "1990-05-01", "Reno"]),
                s(&["2", "Jane", "Doe", "1990-05-01", "Elko"]),
                s(&["3", "Mary", "Jones", "1985-01-01", "Ely"]),
            ],
        );
        let needles = RawTable::new(
            s(&["FIRST NAME", "LAST NAME", "DATE OF BIRTH"]),
            vec![
                s(&["John", "Smith", "05/01/1990"]),
                s(&["Nobody", "Here", "not a date"]),
            ],
        );
        let haystack = normalize_table("haystack", &hay, DateMode::Flexible).unwrap();
        let needles = normalize_table("needles", &needles, DateMode::Flexible).unwrap();
        let opts = MatchOptions::default();
        let outcome = run_batch(&needles, &haystack, &opts, |_| {});
        let run = SummaryBuilder::new("needles.csv", "haystack.csv")
            .with_datasets(&needles, &haystack)
            .with_options(&opts)
            .with_outcome(&outcome)
            .build();
        Fixture {
            needles,
            haystack,
            outcome,
            run,
        }
    }
}
