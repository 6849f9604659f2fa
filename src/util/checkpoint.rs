use std::{
    fs,
    path::{Path, PathBuf},
};

use blake3::Hasher;
use serde::{Deserialize, Serialize};

use crate::error::CheckpointError;
use crate::matching::{MatchOptions, MatchResult};
use crate::models::Dataset;

/// Progress of a batch job: the results of the first `next_query` needles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchCheckpoint {
    pub job: String,
    pub next_query: usize,
    pub total: usize,
    pub results: Vec<MatchResult>,
    pub updated_utc: String,
}

impl BatchCheckpoint {
    pub fn new(job: &str, total: usize, results: Vec<MatchResult>) -> Self {
        Self {
            job: job.to_string(),
            next_query: results.len(),
            total,
            results,
            updated_utc: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn ensure_job(&self, expected: &str) -> Result<(), CheckpointError> {
        if self.job != expected {
            return Err(CheckpointError::JobMismatch {
                expected: expected.to_string(),
                found: self.job.clone(),
            });
        }
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        self.next_query >= self.total
    }
}

/// Job identity used to refuse resuming somebody else's progress. Stored results
/// point at haystack rows by position, so the contents of both datasets take part.
pub fn job_signature(
    needles_label: &str,
    haystack_label: &str,
    needles: &Dataset,
    haystack: &Dataset,
    opts: &MatchOptions,
) -> String {
    format!(
        "{}|{}|n{}:{}|h{}:{}|t{}|{}",
        needles_label,
        haystack_label,
        needles.len(),
        &dataset_fingerprint(needles)[..16],
        haystack.len(),
        &dataset_fingerprint(haystack)[..16],
        opts.threshold,
        opts.scorer
    )
}

/// blake3 over the normalized headers and every record in row order.
pub fn dataset_fingerprint(ds: &Dataset) -> String {
    const UNIT: &[u8] = b"\x1f";
    const RECORD: &[u8] = b"\x1e";
    let mut hasher = Hasher::new();
    for h in &ds.headers {
        hasher.update(h.as_bytes());
        hasher.update(UNIT);
    }
    hasher.update(RECORD);
    for rec in &ds.records {
        hasher.update(rec.first_name.as_bytes());
        hasher.update(UNIT);
        hasher.update(rec.last_name.as_bytes());
        hasher.update(UNIT);
        hasher.update(rec.date_of_birth.to_string().as_bytes());
        for (k, v) in &rec.extra_fields {
            hasher.update(UNIT);
            hasher.update(k.as_bytes());
            hasher.update(UNIT);
            hasher.update(v.as_bytes());
        }
        hasher.update(RECORD);
    }
    hasher.finalize().to_hex().to_string()
}

pub trait Checkpointer {
    // Persist the latest batch progress
    fn save(&mut self, cp: &BatchCheckpoint) -> Result<(), CheckpointError>;
    // Recover progress if any was saved
    fn load(&self) -> Result<Option<BatchCheckpoint>, CheckpointError>;
    // Drop saved progress once the job is finished
    fn clear(&mut self) -> Result<(), CheckpointError>;
}

/// JSON checkpoint file, replaced atomically on every save.
#[derive(Debug, Clone)]
pub struct FileCheckpointer {
    path: PathBuf,
    saves: usize,
}

impl FileCheckpointer {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            saves: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn saves(&self) -> usize {
        self.saves
    }

    fn io_err(&self, source: std::io::Error) -> CheckpointError {
        CheckpointError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

impl Checkpointer for FileCheckpointer {
    fn save(&mut self, cp: &BatchCheckpoint) -> Result<(), CheckpointError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
            }
        }
        let body = serde_json::to_vec(cp).map_err(|e| CheckpointError::Corrupt {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        })?;
        // write atomically: write to tmp then rename
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, &body).map_err(|e| self.io_err(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.io_err(e))?;
        self.saves += 1;
        log::debug!(
            "Checkpoint saved to {} at query {}/{}",
            self.path.display(),
            cp.next_query,
            cp.total
        );
        Ok(())
    }

    fn load(&self) -> Result<Option<BatchCheckpoint>, CheckpointError> {
        let body = match fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_err(e)),
        };
        serde_json::from_slice(&body)
            .map(Some)
            .map_err(|e| CheckpointError::Corrupt {
                path: self.path.display().to_string(),
                reason: e.to_string(),
            })
    }

    fn clear(&mut self) -> Result<(), CheckpointError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_err(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::ScoredCandidate;
    use crate::models::{BirthDate, ColumnLayout, PersonRecord};
    use chrono::NaiveDate;

    fn sample() -> BatchCheckpoint {
        BatchCheckpoint::new(
            "job-a",
            3,
            vec![MatchResult {
                query_row: Some(0),
                dob_candidates: vec![ScoredCandidate {
                    haystack_row: 4,
                    first_name_score: 86,
                    last_name_score: 100,
                }],
                exact_matches: vec![],
            }],
        )
    }

    #[test]
    fn save_load_clear() {
        let dir = tempfile::tempdir().unwrap();
        let mut ck = FileCheckpointer::new(dir.path().join("nested").join("job.ckpt"));
        assert!(ck.load().unwrap().is_none());

        let cp = sample();
        ck.save(&cp).unwrap();
        assert_eq!(ck.saves(), 1);
        let back = ck.load().unwrap().unwrap();
        assert_eq!(back, cp);
        assert_eq!(back.next_query, 1);
        assert!(!back.is_complete());

        ck.clear().unwrap();
        assert!(ck.load().unwrap().is_none());
        ck.clear().unwrap();
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.ckpt");
        std::fs::write(&path, b"not json").unwrap();
        let ck = FileCheckpointer::new(&path);
        assert!(matches!(ck.load(), Err(CheckpointError::Corrupt { .. })));
    }

    #[test]
    fn job_mismatch_is_rejected() {
        let cp = sample();
        assert!(cp.ensure_job("job-a").is_ok());
        assert!(matches!(
            cp.ensure_job("job-b"),
            Err(CheckpointError::JobMismatch { .. })
        ));
    }

    fn people(rows: &[(&str, &str, &str)]) -> Dataset {
        Dataset {
            name: "haystack".into(),
            headers: vec!["FIRST NAME".into(), "LAST NAME".into(), "DATE OF BIRTH".into()],
            layout: ColumnLayout {
                first_name: 0,
                last_name: 1,
                date_of_birth: 2,
            },
            records: rows
                .iter()
                .map(|(f, l, d)| {
                    let dob = NaiveDate::parse_from_str(d, "%Y-%m-%d")
                        .map(BirthDate::Valid)
                        .unwrap_or(BirthDate::Invalid);
                    PersonRecord::new(f, l, dob)
                })
                .collect(),
        }
    }

    #[test]
    fn signature_reflects_options() {
        let n = people(&[("JOHN", "SMITH", "1990-05-01")]);
        let h = people(&[("JON", "SMITH", "1990-05-01"), ("MARY", "JONES", "1985-01-01")]);
        let a = job_signature("n.csv", "h.xlsx", &n, &h, &MatchOptions::default());
        let b = job_signature(
            "n.csv",
            "h.xlsx",
            &n,
            &h,
            &MatchOptions {
                threshold: 80,
                ..Default::default()
            },
        );
        assert_ne!(a, b);
        assert!(a.starts_with("n.csv|h.xlsx|n1:"));
        assert!(a.ends_with("|t75|ratio"));
        assert_eq!(a, job_signature("n.csv", "h.xlsx", &n, &h, &MatchOptions::default()));
    }

    #[test]
    fn signature_tracks_dataset_contents() {
        let n = people(&[("JOHN", "SMITH", "1990-05-01")]);
        let h = people(&[("JON", "SMITH", "1990-05-01"), ("MARY", "JONES", "1985-01-01")]);
        let opts = MatchOptions::default();
        let base = job_signature("n.csv", "h.csv", &n, &h, &opts);

        let reordered =
            people(&[("MARY", "JONES", "1985-01-01"), ("JON", "SMITH", "1990-05-01")]);
        assert_ne!(base, job_signature("n.csv", "h.csv", &n, &reordered, &opts));

        let edited = people(&[("JON", "SMITH", "1990-05-02"), ("MARY", "JONES", "1985-01-01")]);
        assert_ne!(base, job_signature("n.csv", "h.csv", &n, &edited, &opts));

        let mut extra = h.clone();
        extra.records[1].extra_fields.push(("CITY".into(), "Reno".into()));
        assert_ne!(dataset_fingerprint(&h), dataset_fingerprint(&extra));
    }
}
