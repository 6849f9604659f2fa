//! High-level workflow: load both datasets, normalize, match, export, report.

pub mod summary;

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{info, warn};
use serde::Serialize;

use crate::config::AppConfig;
use crate::export::{ExportInput, export_outcome};
use crate::matching::{
    BatchContext, BatchOutcome, MatchOptions, MatchResult, QueryProgress, StreamControl,
    run_batch_with,
};
use crate::metrics::memory_stats_mb;
use crate::models::{Dataset, PersonRecord};
use crate::normalize::{DateMode, manual_query, normalize_table};
use crate::source::load_table;
use crate::util::checkpoint::{Checkpointer, FileCheckpointer, job_signature};
use summary::{RunSummary, SummaryBuilder};

/// Load a file and normalize it. A missing required column aborts here, before
/// any record reaches the matcher.
pub fn load_dataset(name: &str, path: &str, sheet: Option<&str>) -> Result<Dataset> {
    let raw = load_table(Path::new(path), sheet)
        .with_context(|| format!("loading {} dataset", name))?;
    let ds = normalize_table(name, &raw, DateMode::Flexible)?;
    Ok(ds)
}

#[derive(Debug)]
pub struct SearchReport {
    pub outcome: BatchOutcome,
    pub run: RunSummary,
    pub written: Vec<PathBuf>,
}

/// Log one finished query the way the interactive tool reported it.
pub fn log_query_progress(p: &QueryProgress<'_>) {
    info!(
        "Searching for: {} {}, DOB: {}",
        p.query.first_name,
        p.query.last_name,
        p.query.date_of_birth.canonical().unwrap_or_default()
    );
    if p.exact_matches > 0 {
        info!(
            "Found {} exact matches for {} {}",
            p.exact_matches, p.query.first_name, p.query.last_name
        );
    } else {
        warn!(
            "No exact name match, but {} records have the same DOB.",
            p.dob_candidates
        );
    }
    log::debug!(
        "progress {}/{} ({:.1}%), eta {}s",
        p.processed,
        p.total,
        p.percent,
        p.eta_secs
    );
}

pub fn run_search(cfg: &AppConfig) -> Result<SearchReport> {
    run_search_with(cfg, None)
}

/// Batch search with an optional cancel handle. The checkpoint file, if configured,
/// is removed once the run completes.
pub fn run_search_with(cfg: &AppConfig, control: Option<&StreamControl>) -> Result<SearchReport> {
    cfg.validate()?;
    let started = chrono::Utc::now();
    let mem_start = memory_stats_mb();
    let opts: MatchOptions = cfg.matching.options();

    let haystack = load_dataset(
        "haystack",
        &cfg.input.haystack,
        cfg.input.haystack_sheet.as_deref(),
    )?;
    let needles = load_dataset(
        "needles",
        &cfg.input.needles,
        cfg.input.needles_sheet.as_deref(),
    )?;
    info!(
        "Matching {} needle rows against {} haystack rows (threshold {}, scorer {})",
        needles.len(),
        haystack.len(),
        opts.threshold,
        opts.scorer
    );

    let job = job_signature(
        &cfg.input.needles,
        &cfg.input.haystack,
        &needles,
        &haystack,
        &opts,
    );
    let mut checkpointer = cfg.checkpoint.path.as_ref().map(FileCheckpointer::new);
    let resume = match (&checkpointer, cfg.checkpoint.resume) {
        (Some(ck), true) => match ck.load()? {
            Some(cp) => {
                cp.ensure_job(&job)?;
                Some(cp)
            }
            None => {
                warn!(
                    "No checkpoint at {}; starting from the first query",
                    ck.path().display()
                );
                None
            }
        },
        _ => None,
    };

    let ctx = BatchContext {
        job,
        control,
        checkpointer: checkpointer.as_mut().map(|c| c as &mut dyn Checkpointer),
        checkpoint_every: cfg.checkpoint.every,
        resume,
    };
    let outcome = run_batch_with(&needles, &haystack, &opts, ctx, log_query_progress);

    if !outcome.cancelled {
        if let Some(ck) = checkpointer.as_mut() {
            ck.clear()?;
        }
    }

    let run = SummaryBuilder::new(&cfg.input.needles, &cfg.input.haystack)
        .with_datasets(&needles, &haystack)
        .with_options(&opts)
        .with_outcome(&outcome)
        .with_memory(mem_start.used_mb, memory_stats_mb().used_mb)
        .with_timestamps(started, chrono::Utc::now())
        .build();

    let written = export_outcome(
        &cfg.export,
        &ExportInput {
            needles: &needles,
            haystack: &haystack,
            outcome: &outcome,
            run: &run,
        },
    )?;

    for (label, value) in run.lines() {
        info!("{}: {}", label, value);
    }
    Ok(SearchReport {
        outcome,
        run,
        written,
    })
}

#[derive(Debug, Serialize)]
pub struct LookupCandidate {
    pub record: PersonRecord,
    pub first_name_score: u8,
    pub last_name_score: u8,
    pub exact_match: bool,
}

#[derive(Debug, Serialize)]
pub struct LookupReport {
    pub query: PersonRecord,
    pub threshold: u8,
    pub scorer: String,
    pub candidates: Vec<LookupCandidate>,
    pub exact_match_count: usize,
}

impl LookupReport {
    pub fn new(
        query: PersonRecord,
        haystack: &Dataset,
        result: &MatchResult,
        opts: &MatchOptions,
    ) -> Self {
        let candidates = result
            .candidates(haystack)
            .map(|(rec, c)| LookupCandidate {
                record: rec.clone(),
                first_name_score: c.first_name_score,
                last_name_score: c.last_name_score,
                exact_match: result.is_exact(c.haystack_row),
            })
            .collect();
        Self {
            query,
            threshold: opts.threshold,
            scorer: opts.scorer.to_string(),
            candidates,
            exact_match_count: result.exact_matches.len(),
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let dob = self
            .query
            .date_of_birth
            .canonical()
            .unwrap_or_else(|| "INVALID".to_string());
        let _ = writeln!(out, "Query: {}, DOB: {}", self.query.display_name(), dob);
        if self.candidates.is_empty() {
            let _ = writeln!(out, "No records share this date of birth.");
            return out;
        }
        let _ = writeln!(
            out,
            "{} record(s) share this date of birth, {} exact match(es) at threshold {} ({}):",
            self.candidates.len(),
            self.exact_match_count,
            self.threshold,
            self.scorer
        );
        for c in &self.candidates {
            let _ = writeln!(
                out,
                "  {} {:<30} first {:>3}  last {:>3}",
                if c.exact_match { "*" } else { " " },
                c.record.display_name(),
                c.first_name_score,
                c.last_name_score
            );
        }
        out
    }
}

/// Single-record lookup against a haystack file. The DOB must be `MM/DD/YYYY`.
pub fn run_lookup(
    haystack_path: &str,
    haystack_sheet: Option<&str>,
    first_name: &str,
    last_name: &str,
    dob: &str,
    opts: &MatchOptions,
) -> Result<LookupReport> {
    let query = manual_query(first_name, last_name, dob);
    if !query.date_of_birth.is_valid() {
        warn!("Date of birth '{}' is not MM/DD/YYYY; nothing can match", dob);
    }
    let haystack = load_dataset("haystack", haystack_path, haystack_sheet)?;
    let result = crate::matching::lookup(&query, &haystack, opts);
    Ok(LookupReport::new(query, &haystack, &result, opts))
}
