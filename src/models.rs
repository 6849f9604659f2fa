use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const COL_FIRST_NAME: &str = "FIRST NAME";
pub const COL_LAST_NAME: &str = "LAST NAME";
pub const COL_DATE_OF_BIRTH: &str = "DATE OF BIRTH";

/// Required columns, in the order they are reported when missing.
pub const REQUIRED_COLUMNS: [&str; 3] = [COL_FIRST_NAME, COL_LAST_NAME, COL_DATE_OF_BIRTH];

/// Rows and headers exactly as an input adapter produced them. Every cell is a string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }
}

/// Canonical date of birth. `Invalid` is the sentinel for anything that failed to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BirthDate {
    Valid(NaiveDate),
    Invalid,
}

impl BirthDate {
    /// Key used for DOB filtering. The sentinel has no key, so it never joins anything.
    pub fn key(&self) -> Option<NaiveDate> {
        match self {
            Self::Valid(d) => Some(*d),
            Self::Invalid => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    /// DOB equality as used by the pre-filter: two invalid dates are never the same day.
    pub fn same_day(&self, other: &BirthDate) -> bool {
        match (self.key(), other.key()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// `YYYY-MM-DD`, or `None` for the sentinel.
    pub fn canonical(&self) -> Option<String> {
        self.key().map(|d| d.format("%Y-%m-%d").to_string())
    }
}

impl std::fmt::Display for BirthDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Valid(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Self::Invalid => write!(f, "INVALID"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonRecord {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: BirthDate,
    /// Non-required source columns in source order: (normalized header, raw value).
    #[serde(default)]
    pub extra_fields: Vec<(String, String)>,
}

impl PersonRecord {
    pub fn new(first_name: &str, last_name: &str, date_of_birth: BirthDate) -> Self {
        Self {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            date_of_birth,
            extra_fields: Vec::new(),
        }
    }

    pub fn extra(&self, column: &str) -> Option<&str> {
        self.extra_fields
            .iter()
            .find(|(k, _)| k == column)
            .map(|(_, v)| v.as_str())
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Positions of the required columns within a dataset's header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    pub first_name: usize,
    pub last_name: usize,
    pub date_of_birth: usize,
}

#[derive(Debug, Clone)]
pub struct Dataset {
    pub name: String,
    /// Normalized headers in source order.
    pub headers: Vec<String>,
    pub layout: ColumnLayout,
    pub records: Vec<PersonRecord>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, row: usize) -> Option<&PersonRecord> {
        self.records.get(row)
    }

    pub fn invalid_dob_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| !r.date_of_birth.is_valid())
            .count()
    }

    /// Flatten a record back into this dataset's column order, with normalized
    /// name and DOB values and extra columns passed through.
    pub fn export_row(&self, record: &PersonRecord) -> Vec<String> {
        let mut extras = record.extra_fields.iter();
        (0..self.headers.len())
            .map(|col| {
                if col == self.layout.first_name {
                    record.first_name.clone()
                } else if col == self.layout.last_name {
                    record.last_name.clone()
                } else if col == self.layout.date_of_birth {
                    record.date_of_birth.canonical().unwrap_or_default()
                } else {
                    extras.next().map(|(_, v)| v.clone()).unwrap_or_default()
                }
            })
            .collect()
    }
}

/// One line of the per-query search summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub first_name: String,
    pub last_name: String,
    /// Canonical DOB, empty when the query's DOB was invalid.
    pub date_of_birth: String,
    pub dob_match_count: usize,
    pub exact_match_count: usize,
}

pub const SUMMARY_HEADERS: [&str; 5] = [
    "FIRST NAME",
    "LAST NAME",
    "DATE OF BIRTH",
    "DOB MATCH COUNT",
    "EXACT MATCH COUNT",
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSummary {
    pub rows: Vec<SummaryRow>,
}

impl SearchSummary {
    pub fn push(&mut self, row: SummaryRow) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn total_exact_matches(&self) -> usize {
        self.rows.iter().map(|r| r.exact_match_count).sum()
    }

    pub fn total_dob_candidates(&self) -> usize {
        self.rows.iter().map(|r| r.dob_match_count).sum()
    }

    pub fn queries_with_match(&self) -> usize {
        self.rows.iter().filter(|r| r.exact_match_count > 0).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> BirthDate {
        BirthDate::Valid(NaiveDate::from_ymd_opt(y, m, day).unwrap())
    }

    #[test]
    fn invalid_dates_are_never_the_same_day() {
        assert!(!BirthDate::Invalid.same_day(&BirthDate::Invalid));
        assert!(!BirthDate::Invalid.same_day(&d(1990, 5, 1)));
        assert!(d(1990, 5, 1).same_day(&d(1990, 5, 1)));
        assert!(!d(1990, 5, 1).same_day(&d(1990, 5, 2)));
    }

    #[test]
    fn canonical_form() {
        assert_eq!(d(1990, 5, 1).canonical().as_deref(), Some("1990-05-01"));
        assert_eq!(BirthDate::Invalid.canonical(), None);
        assert_eq!(BirthDate::Invalid.to_string(), "INVALID");
    }

    #[test]
    fn export_row_restores_column_order() {
        let ds = Dataset {
            name: "haystack".into(),
            headers: vec![
                "ID".into(),
                "LAST NAME".into(),
                "FIRST NAME".into(),
                "CITY".into(),
                "DATE OF BIRTH".into(),
            ],
            layout: ColumnLayout {
                first_name: 2,
                last_name: 1,
                date_of_birth: 4,
            },
            records: vec![],
        };
        let mut rec = PersonRecord::new("JON", "SMITH", d(1990, 5, 1));
        rec.extra_fields = vec![("ID".into(), "7".into()), ("CITY".into(), "Reno".into())];
        assert_eq!(
            ds.export_row(&rec),
            vec!["7", "SMITH", "JON", "Reno", "1990-05-01"]
        );
        assert_eq!(rec.extra("CITY"), Some("Reno"));
    }
}
