use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use serde::Serialize;

use crate::error::ExportError;
use crate::export::{ExportInput, ensure_parent_dir};
use crate::models::SummaryRow;
use crate::orchestrator::summary::RunSummary;

#[derive(Debug, Serialize)]
pub struct AuditCandidate<'a> {
    pub haystack_row: usize,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub date_of_birth: String,
    pub first_name_score: u8,
    pub last_name_score: u8,
    pub exact_match: bool,
}

#[derive(Debug, Serialize)]
pub struct AuditQuery<'a> {
    pub query_row: Option<usize>,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub date_of_birth: String,
    pub candidates: Vec<AuditCandidate<'a>>,
}

#[derive(Debug, Serialize)]
pub struct AuditDocument<'a> {
    pub run: &'a RunSummary,
    pub summary: &'a [SummaryRow],
    pub results: Vec<AuditQuery<'a>>,
}

pub fn audit_document<'a>(input: &ExportInput<'a>) -> AuditDocument<'a> {
    let haystack = input.haystack;
    let results = input
        .outcome
        .results
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let row = r.query_row.unwrap_or(i);
            let query = input.needles.get(row);
            AuditQuery {
                query_row: r.query_row,
                first_name: query.map(|q| q.first_name.as_str()).unwrap_or(""),
                last_name: query.map(|q| q.last_name.as_str()).unwrap_or(""),
                date_of_birth: query
                    .and_then(|q| q.date_of_birth.canonical())
                    .unwrap_or_default(),
                candidates: r
                    .candidates(haystack)
                    .map(|(rec, c)| AuditCandidate {
                        haystack_row: c.haystack_row,
                        first_name: &rec.first_name,
                        last_name: &rec.last_name,
                        date_of_birth: rec.date_of_birth.canonical().unwrap_or_default(),
                        first_name_score: c.first_name_score,
                        last_name_score: c.last_name_score,
                        exact_match: r.is_exact(c.haystack_row),
                    })
                    .collect(),
            }
        })
        .collect();
    AuditDocument {
        run: input.run,
        summary: &input.outcome.summary.rows,
        results,
    }
}

pub fn export_to_json(path: &Path, input: &ExportInput<'_>) -> Result<(), ExportError> {
    ensure_parent_dir(path).map_err(|e| ExportError::Json(e.to_string()))?;
    let file =
        File::create(path).map_err(|e| ExportError::Json(format!("{}: {}", path.display(), e)))?;
    serde_json::to_writer_pretty(BufWriter::new(file), &audit_document(input))
        .map_err(|e| ExportError::Json(format!("{}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::fixtures::fixture;

    #[test]
    fn audit_document_shape() {
        let f = fixture();
        let value = serde_json::to_value(audit_document(&f.input())).unwrap();
        assert_eq!(value["run"]["queries_processed"], 2);
        assert_eq!(value["run"]["total_exact_matches"], 1);
        assert_eq!(value["summary"].as_array().unwrap().len(), 2);
        let first = &value["results"][0];
        assert_eq!(first["first_name"], "JOHN");
        let cands = first["candidates"].as_array().unwrap();
        assert_eq!(cands.len(), 2);
        assert_eq!(cands[0]["first_name"], "JON");
        assert_eq!(cands[0]["first_name_score"], 86);
        assert_eq!(cands[0]["exact_match"], true);
        assert_eq!(cands[1]["first_name"], "JANE");
        assert_eq!(cands[1]["exact_match"], false);
        assert_eq!(value["results"][1]["date_of_birth"], "");
    }

    #[test]
    fn writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("audit.json");
        export_to_json(&p, &fixture().input()).unwrap();
        let v: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&p).unwrap()).unwrap();
        assert!(v["results"].is_array());
    }
}
