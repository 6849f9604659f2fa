//! Run-level audit figures for a batch search.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::matching::{BatchOutcome, MatchOptions};
use crate::models::Dataset;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub needles: String,
    pub haystack: String,
    pub needle_rows: usize,
    pub haystack_rows: usize,
    pub needle_invalid_dob: usize,
    pub haystack_invalid_dob: usize,

    pub queries_processed: usize,
    pub queries_with_match: usize,
    pub total_dob_candidates: usize,
    pub total_exact_matches: usize,

    pub threshold: u8,
    pub scorer: String,
    pub resumed_from: usize,
    pub cancelled: bool,

    pub started_utc: DateTime<Utc>,
    pub ended_utc: DateTime<Utc>,
    pub duration_secs: f64,

    pub mem_used_start_mb: u64,
    pub mem_used_end_mb: u64,
}

/// Builder for RunSummary.
#[derive(Debug, Clone)]
pub struct SummaryBuilder {
    pub needles: String,
    pub haystack: String,
    pub needle_rows: usize,
    pub haystack_rows: usize,
    pub needle_invalid_dob: usize,
    pub haystack_invalid_dob: usize,
    pub opts: MatchOptions,
    pub queries_processed: usize,
    pub queries_with_match: usize,
    pub total_dob_candidates: usize,
    pub total_exact_matches: usize,
    pub resumed_from: usize,
    pub cancelled: bool,
    pub mem_used_start_mb: u64,
    pub mem_used_end_mb: u64,
    pub started_utc: DateTime<Utc>,
    pub ended_utc: DateTime<Utc>,
}

impl Default for SummaryBuilder {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            needles: String::new(),
            haystack: String::new(),
            needle_rows: 0,
            haystack_rows: 0,
            needle_invalid_dob: 0,
            haystack_invalid_dob: 0,
            opts: MatchOptions::default(),
            queries_processed: 0,
            queries_with_match: 0,
            total_dob_candidates: 0,
            total_exact_matches: 0,
            resumed_from: 0,
            cancelled: false,
            mem_used_start_mb: 0,
            mem_used_end_mb: 0,
            started_utc: now,
            ended_utc: now,
        }
    }
}

impl SummaryBuilder {
    pub fn new(needles: &str, haystack: &str) -> Self {
        Self {
            needles: needles.to_string(),
            haystack: haystack.to_string(),
            ..Default::default()
        }
    }

    /// Row and invalid-DOB counts of both datasets.
    pub fn with_datasets(mut self, needles: &Dataset, haystack: &Dataset) -> Self {
        self.needle_rows = needles.len();
        self.haystack_rows = haystack.len();
        self.needle_invalid_dob = needles.invalid_dob_count();
        self.haystack_invalid_dob = haystack.invalid_dob_count();
        self
    }

    pub fn with_options(mut self, opts: &MatchOptions) -> Self {
        self.opts = *opts;
        self
    }

    pub fn with_outcome(mut self, outcome: &BatchOutcome) -> Self {
        self.queries_processed = outcome.processed();
        self.queries_with_match = outcome.summary.queries_with_match();
        self.total_dob_candidates = outcome.summary.total_dob_candidates();
        self.total_exact_matches = outcome.summary.total_exact_matches();
        self.resumed_from = outcome.resumed_from;
        self.cancelled = outcome.cancelled;
        self
    }

    pub fn with_memory(mut self, start_mb: u64, end_mb: u64) -> Self {
        self.mem_used_start_mb = start_mb;
        self.mem_used_end_mb = end_mb;
        self
    }

    pub fn with_timestamps(mut self, started: DateTime<Utc>, ended: DateTime<Utc>) -> Self {
        self.started_utc = started;
        self.ended_utc = ended;
        self
    }

    pub fn build(self) -> RunSummary {
        let duration_secs = (self.ended_utc - self.started_utc).num_milliseconds() as f64 / 1000.0;
        RunSummary {
            needles: self.needles,
            haystack: self.haystack,
            needle_rows: self.needle_rows,
            haystack_rows: self.haystack_rows,
            needle_invalid_dob: self.needle_invalid_dob,
            haystack_invalid_dob: self.haystack_invalid_dob,
            queries_processed: self.queries_processed,
            queries_with_match: self.queries_with_match,
            total_dob_candidates: self.total_dob_candidates,
            total_exact_matches: self.total_exact_matches,
            threshold: self.opts.threshold,
            scorer: self.opts.scorer.to_string(),
            resumed_from: self.resumed_from,
            cancelled: self.cancelled,
            started_utc: self.started_utc,
            ended_utc: self.ended_utc,
            duration_secs,
            mem_used_start_mb: self.mem_used_start_mb,
            mem_used_end_mb: self.mem_used_end_mb,
        }
    }
}

impl RunSummary {
    /// Label/value pairs in display order, shared by the log report and exports.
    pub fn lines(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Needles", self.needles.clone()),
            ("Haystack", self.haystack.clone()),
            ("Needle rows", self.needle_rows.to_string()),
            ("Haystack rows", self.haystack_rows.to_string()),
            ("Needle rows with invalid DOB", self.needle_invalid_dob.to_string()),
            ("Haystack rows with invalid DOB", self.haystack_invalid_dob.to_string()),
            ("Queries processed", self.queries_processed.to_string()),
            ("Queries with an exact match", self.queries_with_match.to_string()),
            ("Total DOB candidates", self.total_dob_candidates.to_string()),
            ("Total exact matches", self.total_exact_matches.to_string()),
            ("Threshold", self.threshold.to_string()),
            ("Scorer", self.scorer.clone()),
            ("Resumed from query", self.resumed_from.to_string()),
            ("Cancelled", self.cancelled.to_string()),
            ("Started (UTC)", self.started_utc.to_rfc3339()),
            ("Ended (UTC)", self.ended_utc.to_rfc3339()),
            ("Duration (s)", format!("{:.3}", self.duration_secs)),
            ("Memory used at start (MB)", self.mem_used_start_mb.to_string()),
            ("Memory used at end (MB)", self.mem_used_end_mb.to_string()),
        ]
    }
}
