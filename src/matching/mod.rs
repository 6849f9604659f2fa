pub mod birthdate_matcher;
pub mod helpers;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::{Dataset, PersonRecord, SearchSummary, SummaryRow};
use crate::util::checkpoint::{BatchCheckpoint, Checkpointer};

pub use birthdate_matcher::DobIndex;
pub use helpers::Scorer;

/// Both name scores must reach this to accept a DOB candidate.
pub const DEFAULT_THRESHOLD: u8 = 75;

/// Queries evaluated per rayon chunk when no checkpoint cadence is set.
const PARALLEL_CHUNK: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOptions {
    pub threshold: u8,
    pub scorer: Scorer,
    /// Evaluate batch queries on the rayon pool. Output order is unchanged.
    pub parallel: bool,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            scorer: Scorer::Ratio,
            parallel: false,
        }
    }
}

impl MatchOptions {
    pub fn accepts(&self, first_name_score: u8, last_name_score: u8) -> bool {
        first_name_score >= self.threshold && last_name_score >= self.threshold
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    /// Position of the candidate in the haystack dataset.
    pub haystack_row: usize,
    pub first_name_score: u8,
    pub last_name_score: u8,
}

/// Outcome of one query. `exact_matches` is always a subset of `dob_candidates`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Needle row this result belongs to; `None` for a manual lookup.
    pub query_row: Option<usize>,
    pub dob_candidates: Vec<ScoredCandidate>,
    pub exact_matches: Vec<ScoredCandidate>,
}

impl MatchResult {
    pub fn is_empty(&self) -> bool {
        self.dob_candidates.is_empty()
    }

    pub fn is_exact(&self, haystack_row: usize) -> bool {
        self.exact_matches
            .iter()
            .any(|c| c.haystack_row == haystack_row)
    }

    /// Candidate records paired with their scores, in haystack order.
    pub fn candidates<'a>(
        &'a self,
        haystack: &'a Dataset,
    ) -> impl Iterator<Item = (&'a PersonRecord, &'a ScoredCandidate)> + 'a {
        self.dob_candidates
            .iter()
            .filter_map(move |c| haystack.get(c.haystack_row).map(|r| (r, c)))
    }

    pub fn exact_match_records<'a>(
        &'a self,
        haystack: &'a Dataset,
    ) -> impl Iterator<Item = &'a PersonRecord> + 'a {
        self.exact_matches
            .iter()
            .filter_map(move |c| haystack.get(c.haystack_row))
    }

    pub fn summary_row(&self, query: &PersonRecord) -> SummaryRow {
        SummaryRow {
            first_name: query.first_name.clone(),
            last_name: query.last_name.clone(),
            date_of_birth: query.date_of_birth.canonical().unwrap_or_default(),
            dob_match_count: self.dob_candidates.len(),
            exact_match_count: self.exact_matches.len(),
        }
    }
}

pub fn score_candidate(
    query: &PersonRecord,
    candidate: &PersonRecord,
    haystack_row: usize,
    opts: &MatchOptions,
) -> ScoredCandidate {
    ScoredCandidate {
        haystack_row,
        first_name_score: opts.scorer.score(&query.first_name, &candidate.first_name),
        last_name_score: opts.scorer.score(&query.last_name, &candidate.last_name),
    }
}

fn decide<I>(query: &PersonRecord, haystack: &Dataset, rows: I, opts: &MatchOptions) -> MatchResult
where
    I: IntoIterator<Item = usize>,
{
    let mut result = MatchResult::default();
    for row in rows {
        let Some(candidate) = haystack.get(row) else {
            continue;
        };
        let scored = score_candidate(query, candidate, row, opts);
        if opts.accepts(scored.first_name_score, scored.last_name_score) {
            result.exact_matches.push(scored);
        }
        result.dob_candidates.push(scored);
    }
    result
}

/// Match one query using a prebuilt DOB index over `haystack`.
pub fn match_query(
    query: &PersonRecord,
    haystack: &Dataset,
    index: &DobIndex,
    opts: &MatchOptions,
) -> MatchResult {
    decide(
        query,
        haystack,
        index.candidates(&query.date_of_birth).iter().copied(),
        opts,
    )
}

/// Single-record lookup: one linear DOB scan, no index.
pub fn lookup(query: &PersonRecord, haystack: &Dataset, opts: &MatchOptions) -> MatchResult {
    let rows = haystack
        .records
        .iter()
        .enumerate()
        .filter(|(_, r)| r.date_of_birth.same_day(&query.date_of_birth))
        .map(|(i, _)| i);
    decide(query, haystack, rows, opts)
}

/// Per-query notification handed to the batch observer.
#[derive(Debug, Clone, Copy)]
pub struct QueryProgress<'a> {
    pub query_row: usize,
    pub query: &'a PersonRecord,
    pub dob_candidates: usize,
    pub exact_matches: usize,
    pub processed: usize,
    pub total: usize,
    pub percent: f32,
    pub eta_secs: u64,
}

#[derive(Clone, Default)]
pub struct StreamControl {
    pub cancel: Arc<AtomicBool>,
}

impl StreamControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }
}

/// Optional collaborators of a batch run.
pub struct BatchContext<'a> {
    /// Identifies the job in checkpoints; a resume state for another job is ignored.
    pub job: String,
    pub control: Option<&'a StreamControl>,
    pub checkpointer: Option<&'a mut dyn Checkpointer>,
    /// Save after this many completed queries (and always at the end).
    pub checkpoint_every: usize,
    pub resume: Option<BatchCheckpoint>,
}

impl Default for BatchContext<'_> {
    fn default() -> Self {
        Self {
            job: String::new(),
            control: None,
            checkpointer: None,
            checkpoint_every: 100,
            resume: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchOutcome {
    /// One result per processed needle row, in needle order.
    pub results: Vec<MatchResult>,
    pub summary: SearchSummary,
    /// Queries restored from the resume state instead of being recomputed.
    pub resumed_from: usize,
    pub cancelled: bool,
}

impl BatchOutcome {
    pub fn processed(&self) -> usize {
        self.results.len()
    }
}

/// Run every needle against the haystack in needle order.
pub fn run_batch<F>(
    needles: &Dataset,
    haystack: &Dataset,
    opts: &MatchOptions,
    on_progress: F,
) -> BatchOutcome
where
    F: FnMut(&QueryProgress<'_>),
{
    run_batch_with(needles, haystack, opts, BatchContext::default(), on_progress)
}

/// Batch run with cancellation, checkpointing and resume.
pub fn run_batch_with<F>(
    needles: &Dataset,
    haystack: &Dataset,
    opts: &MatchOptions,
    mut ctx: BatchContext<'_>,
    mut on_progress: F,
) -> BatchOutcome
where
    F: FnMut(&QueryProgress<'_>),
{
    let total = needles.len();
    let index = DobIndex::build(haystack);
    let mut outcome = BatchOutcome::default();

    if let Some(cp) = ctx.resume.take() {
        if usable_resume(&cp, &ctx.job, total) {
            log::info!(
                "Resuming {} at query {}/{}",
                if cp.job.is_empty() { "batch" } else { cp.job.as_str() },
                cp.next_query,
                total
            );
            for (rec, res) in needles.records.iter().zip(cp.results.iter()) {
                outcome.summary.push(res.summary_row(rec));
            }
            outcome.resumed_from = cp.next_query;
            outcome.results = cp.results;
        } else {
            log::warn!("Ignoring checkpoint that does not fit this batch; starting over");
        }
    }

    let step = if opts.parallel {
        if ctx.checkpointer.is_some() {
            ctx.checkpoint_every.max(1)
        } else {
            PARALLEL_CHUNK
        }
    } else {
        1
    };
    let every = ctx.checkpoint_every.max(1);
    let started = Instant::now();
    let mut last_saved = outcome.results.len();
    let mut next = outcome.results.len();

    while next < total {
        if ctx.control.is_some_and(|c| c.is_cancelled()) {
            log::warn!("Batch cancelled after {}/{} queries", next, total);
            outcome.cancelled = true;
            break;
        }
        let end = (next + step).min(total);
        let chunk: Vec<MatchResult> = if opts.parallel {
            (next..end)
                .into_par_iter()
                .map(|i| batch_query(needles, haystack, &index, opts, i))
                .collect()
        } else {
            (next..end)
                .map(|i| batch_query(needles, haystack, &index, opts, i))
                .collect()
        };

        for (offset, result) in chunk.into_iter().enumerate() {
            let row = next + offset;
            let query = &needles.records[row];
            outcome.summary.push(result.summary_row(query));
            let processed = row + 1;
            let done_here = processed - outcome.resumed_from;
            let remaining = total - processed;
            let eta_secs = if done_here > 0 {
                (started.elapsed().as_secs_f64() / done_here as f64 * remaining as f64) as u64
            } else {
                0
            };
            on_progress(&QueryProgress {
                query_row: row,
                query,
                dob_candidates: result.dob_candidates.len(),
                exact_matches: result.exact_matches.len(),
                processed,
                total,
                percent: processed as f32 / total.max(1) as f32 * 100.0,
                eta_secs,
            });
            outcome.results.push(result);
        }
        next = end;

        if next - last_saved >= every || next == total {
            save_progress(&mut ctx, &outcome.results, total);
            last_saved = next;
        }
    }

    if outcome.cancelled && last_saved != outcome.results.len() {
        save_progress(&mut ctx, &outcome.results, total);
    }
    outcome
}

fn batch_query(
    needles: &Dataset,
    haystack: &Dataset,
    index: &DobIndex,
    opts: &MatchOptions,
    row: usize,
) -> MatchResult {
    let mut r = match_query(&needles.records[row], haystack, index, opts);
    r.query_row = Some(row);
    r
}

fn usable_resume(cp: &BatchCheckpoint, job: &str, total: usize) -> bool {
    cp.job == job
        && cp.total == total
        && cp.next_query <= total
        && cp.results.len() == cp.next_query
}

fn save_progress(ctx: &mut BatchContext<'_>, results: &[MatchResult], total: usize) {
    let Some(ck) = ctx.checkpointer.as_deref_mut() else {
        return;
    };
    let cp = BatchCheckpoint::new(&ctx.job, total, results.to_vec());
    if let Err(e) = ck.save(&cp) {
        log::warn!("Failed to save checkpoint at query {}: {}", cp.next_query, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BirthDate, ColumnLayout};
    use chrono::NaiveDate;

    fn dob(s: &str) -> BirthDate {
        BirthDate::Valid(NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap())
    }

    fn dataset(name: &str, rows: &[(&str, &str, BirthDate)]) -> Dataset {
        Dataset {
            name: name.into(),
            headers: vec!["FIRST NAME".into(), "LAST NAME".into(), "DATE OF BIRTH".into()],
            layout: ColumnLayout {
                first_name: 0,
                last_name: 1,
                date_of_birth: 2,
            },
            records: rows
                .iter()
                .map(|(f, l, d)| PersonRecord::new(f, l, *d))
                .collect(),
        }
    }

    #[test]
    fn jon_smith_is_an_exact_match_for_john_smith() {
        let hay = dataset("h", &[("JON", "SMITH", dob("1990-05-01"))]);
        let q = PersonRecord::new("JOHN", "SMITH", dob("1990-05-01"));
        let r = lookup(&q, &hay, &MatchOptions::default());
        assert_eq!(r.dob_candidates.len(), 1);
        assert_eq!(r.dob_candidates[0].first_name_score, 86);
        assert_eq!(r.dob_candidates[0].last_name_score, 100);
        assert_eq!(r.exact_matches, r.dob_candidates);
    }

    #[test]
    fn different_dob_yields_nothing() {
        let hay = dataset("h", &[("JON", "SMITH", dob("1990-05-01"))]);
        let q = PersonRecord::new("JON", "SMITH", dob("1990-05-02"));
        let r = lookup(&q, &hay, &MatchOptions::default());
        assert!(r.is_empty());
        assert!(r.exact_matches.is_empty());
    }

    #[test]
    fn invalid_dobs_never_meet() {
        let hay = dataset("h", &[("JON", "SMITH", BirthDate::Invalid)]);
        let q = PersonRecord::new("JON", "SMITH", BirthDate::Invalid);
        assert!(lookup(&q, &hay, &MatchOptions::default()).is_empty());
        let idx = DobIndex::build(&hay);
        assert!(match_query(&q, &hay, &idx, &MatchOptions::default()).is_empty());
    }

    #[test]
    fn threshold_boundary() {
        let opts = MatchOptions::default();
        assert!(opts.accepts(75, 75));
        assert!(!opts.accepts(74, 100));
        assert!(!opts.accepts(100, 74));

        // ABCD/ABCE scores exactly 75
        let hay = dataset("h", &[("ABCE", "ABCE", dob("2000-01-01"))]);
        let q = PersonRecord::new("ABCD", "ABCD", dob("2000-01-01"));
        let r = lookup(&q, &hay, &opts);
        assert_eq!(r.exact_matches.len(), 1);

        // 74 on the last name only
        let hay = dataset(
            "h",
            &[("ABCE", "ABCDEFGHIJKLMNVWXYZ", dob("2000-01-01"))],
        );
        let q = PersonRecord::new("ABCD", "ABCDEFGHIJKLMNOPQRS", dob("2000-01-01"));
        let r = lookup(&q, &hay, &opts);
        assert_eq!(r.dob_candidates[0].last_name_score, 74);
        assert!(r.exact_matches.is_empty());
        assert_eq!(r.dob_candidates.len(), 1);
    }

    #[test]
    fn empty_names_never_match() {
        let hay = dataset("h", &[("", "SMITH", dob("1990-05-01"))]);
        let q = PersonRecord::new("", "SMITH", dob("1990-05-01"));
        let r = lookup(&q, &hay, &MatchOptions::default());
        assert_eq!(r.dob_candidates.len(), 1);
        assert!(r.exact_matches.is_empty());
    }

    #[test]
    fn custom_threshold_applies() {
        let hay = dataset("h", &[("JON", "SMITH", dob("1990-05-01"))]);
        let q = PersonRecord::new("JOHN", "SMITH", dob("1990-05-01"));
        let strict = MatchOptions {
            threshold: 90,
            ..Default::default()
        };
        assert!(lookup(&q, &hay, &strict).exact_matches.is_empty());
    }

    #[test]
    fn batch_keeps_needle_order_and_counts() {
        let hay = dataset(
            "h",
            &[
                ("JON", "SMITH", dob("1990-05-01")),
                ("MARY", "JONES", dob("1985-01-01")),
                ("JANE", "DOE", dob("1990-05-01")),
            ],
        );
        let needles = dataset(
            "n",
            &[
                ("MARY", "JONES", dob("1985-01-01")),
                ("JOHN", "SMITH", dob("1990-05-01")),
                ("NOBODY", "HERE", BirthDate::Invalid),
            ],
        );
        let mut seen = Vec::new();
        let out = run_batch(&needles, &hay, &MatchOptions::default(), |p| {
            seen.push((p.query_row, p.dob_candidates, p.exact_matches));
        });
        assert_eq!(seen, vec![(0, 1, 1), (1, 2, 1), (2, 0, 0)]);
        assert_eq!(out.processed(), 3);
        let names: Vec<_> = out.summary.rows.iter().map(|r| r.first_name.as_str()).collect();
        assert_eq!(names, vec!["MARY", "JOHN", "NOBODY"]);
        assert_eq!(out.summary.rows[2].date_of_birth, "");
        assert_eq!(out.results[1].exact_matches[0].haystack_row, 0);
        for r in &out.results {
            for m in &r.exact_matches {
                assert!(r.dob_candidates.contains(m));
            }
        }
    }

    #[test]
    fn parallel_batch_matches_sequential() {
        let hay = dataset(
            "h",
            &[
                ("JON", "SMITH", dob("1990-05-01")),
                ("JANE", "DOE", dob("1990-05-01")),
            ],
        );
        let rows: Vec<(&str, &str, BirthDate)> = (0..600)
            .map(|i| {
                if i % 2 == 0 {
                    ("JOHN", "SMITH", dob("1990-05-01"))
                } else {
                    ("JANE", "DOE", dob("1991-05-01"))
                }
            })
            .collect();
        let needles = dataset("n", &rows);
        let seq = run_batch(&needles, &hay, &MatchOptions::default(), |_| {});
        let par_opts = MatchOptions {
            parallel: true,
            ..Default::default()
        };
        let mut order = Vec::new();
        let par = run_batch(&needles, &hay, &par_opts, |p| order.push(p.query_row));
        assert_eq!(seq.results, par.results);
        assert_eq!(seq.summary, par.summary);
        assert_eq!(order, (0..600).collect::<Vec<_>>());
    }

    #[test]
    fn cancelled_batch_stops_early() {
        let hay = dataset("h", &[("JON", "SMITH", dob("1990-05-01"))]);
        let needles = dataset(
            "n",
            &[
                ("JON", "SMITH", dob("1990-05-01")),
                ("JON", "SMITH", dob("1990-05-01")),
                ("JON", "SMITH", dob("1990-05-01")),
            ],
        );
        let ctrl = StreamControl::new();
        let ctx = BatchContext {
            control: Some(&ctrl),
            ..Default::default()
        };
        let out = run_batch_with(&needles, &hay, &MatchOptions::default(), ctx, |p| {
            if p.processed == 2 {
                ctrl.cancel();
            }
        });
        assert!(out.cancelled);
        assert_eq!(out.processed(), 2);
        assert_eq!(out.summary.len(), 2);
    }
}
