use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};

use crate::models::{BirthDate, Dataset};

/// Date-only layouts tried by the flexible parser, in order. Numeric forms are month-first.
const FLEXIBLE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%m.%d.%Y",
    "%d-%b-%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%b %d %Y",
    "%B %d %Y",
];

/// Two-digit-year layouts, only consulted after every four-digit layout failed.
const SHORT_YEAR_FORMATS: &[&str] = &["%m/%d/%y", "%m-%d-%y", "%d-%b-%y"];

/// Years below this are treated as a misread two-digit year, not a real birth year.
const MIN_FOUR_DIGIT_YEAR: i32 = 1000;

/// Parse a DOB from a file-derived cell. Accepts the common spreadsheet/CSV layouts
/// (ISO, US month-first, named months, compact `YYYYMMDD`) with an optional trailing
/// time component. Anything else becomes the invalid sentinel.
pub fn parse_date_flexible(input: &str) -> BirthDate {
    let s = input.trim();
    if s.is_empty() {
        return BirthDate::Invalid;
    }
    if let Some(d) = parse_date_only(s) {
        return BirthDate::Valid(d);
    }
    if let Some(date_part) = strip_time_component(s) {
        if let Some(d) = parse_date_only(date_part) {
            return BirthDate::Valid(d);
        }
    }
    BirthDate::Invalid
}

/// Parse an interactively entered DOB: exactly `MM/DD/YYYY` (one or two digit month/day,
/// four digit year).
pub fn parse_date_strict(input: &str) -> BirthDate {
    let s = input.trim();
    let Some(year_part) = s.rsplit('/').next() else {
        return BirthDate::Invalid;
    };
    if s.split('/').count() != 3 || year_part.len() != 4 {
        return BirthDate::Invalid;
    }
    match NaiveDate::parse_from_str(s, "%m/%d/%Y") {
        Ok(d) => BirthDate::Valid(d),
        Err(_) => BirthDate::Invalid,
    }
}

fn parse_date_only(s: &str) -> Option<NaiveDate> {
    if s.len() == 8 && s.bytes().all(|b| b.is_ascii_digit()) {
        let y = s[0..4].parse().ok()?;
        let m = s[4..6].parse().ok()?;
        let d = s[6..8].parse().ok()?;
        return NaiveDate::from_ymd_opt(y, m, d);
    }
    for fmt in FLEXIBLE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            if d.year() >= MIN_FOUR_DIGIT_YEAR {
                return Some(d);
            }
        }
    }
    SHORT_YEAR_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// `"1990-05-01 00:00:00"` / `"1990-05-01T00:00:00Z"` → `"1990-05-01"`.
/// The time starts at the last space or `T` before the first `:`.
fn strip_time_component(s: &str) -> Option<&str> {
    let colon = s.find(':')?;
    let idx = s[..colon].rfind(|c: char| c == 'T' || c.is_whitespace())?;
    Some(s[..idx].trim_end())
}

/// Haystack rows grouped by canonical DOB. Rows with an invalid DOB are left out,
/// so they can never be candidates.
#[derive(Debug, Clone, Default)]
pub struct DobIndex {
    by_date: HashMap<NaiveDate, Vec<usize>>,
    indexed_rows: usize,
}

impl DobIndex {
    pub fn build(dataset: &Dataset) -> Self {
        let mut by_date: HashMap<NaiveDate, Vec<usize>> = HashMap::new();
        let mut indexed_rows = 0usize;
        for (row, rec) in dataset.records.iter().enumerate() {
            if let Some(key) = rec.date_of_birth.key() {
                by_date.entry(key).or_default().push(row);
                indexed_rows += 1;
            }
        }
        log::debug!(
            "DOB index for {}: {} distinct dates over {} rows ({} skipped as invalid)",
            dataset.name,
            by_date.len(),
            indexed_rows,
            dataset.len() - indexed_rows
        );
        Self {
            by_date,
            indexed_rows,
        }
    }

    /// Haystack row positions sharing `dob`, in haystack order.
    pub fn candidates(&self, dob: &BirthDate) -> &[usize] {
        dob.key()
            .and_then(|k| self.by_date.get(&k))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn distinct_dates(&self) -> usize {
        self.by_date.len()
    }

    pub fn indexed_rows(&self) -> usize {
        self.indexed_rows
    }
}
