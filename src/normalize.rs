use crate::error::SchemaError;
use crate::matching::birthdate_matcher::{parse_date_flexible, parse_date_strict};
use crate::models::{
    BirthDate, COL_DATE_OF_BIRTH, COL_FIRST_NAME, COL_LAST_NAME, ColumnLayout, Dataset,
    PersonRecord, REQUIRED_COLUMNS, RawTable,
};

/// How the DOB column of a source should be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateMode {
    /// File-derived values: any common layout.
    Flexible,
    /// Interactively entered values: `MM/DD/YYYY` only.
    Strict,
}

impl DateMode {
    pub fn parse(&self, value: &str) -> BirthDate {
        match self {
            Self::Flexible => parse_date_flexible(value),
            Self::Strict => parse_date_strict(value),
        }
    }
}

/// Trim, collapse inner whitespace, upper-case. Also drops a leading BOM.
pub fn normalize_header(input: &str) -> String {
    input
        .trim_start_matches('\u{feff}')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// Trim leading/trailing whitespace and upper-case.
pub fn normalize_name(input: &str) -> String {
    input.trim().to_uppercase()
}

/// Locate the required columns in a header row after header normalization.
pub fn resolve_layout(dataset: &str, headers: &[String]) -> Result<ColumnLayout, SchemaError> {
    let find = |name: &str| headers.iter().position(|h| h == name);
    let first_name = find(COL_FIRST_NAME);
    let last_name = find(COL_LAST_NAME);
    let date_of_birth = find(COL_DATE_OF_BIRTH);
    match (first_name, last_name, date_of_birth) {
        (Some(first_name), Some(last_name), Some(date_of_birth)) => Ok(ColumnLayout {
            first_name,
            last_name,
            date_of_birth,
        }),
        _ => Err(SchemaError {
            dataset: dataset.to_string(),
            missing: REQUIRED_COLUMNS
                .iter()
                .filter(|c| find(**c).is_none())
                .map(|c| c.to_string())
                .collect(),
        }),
    }
}

/// Turn a raw table into a canonical dataset. Schema problems are reported before
/// any row is touched; per-row date problems degrade to the invalid sentinel.
pub fn normalize_table(
    dataset: &str,
    raw: &RawTable,
    mode: DateMode,
) -> Result<Dataset, SchemaError> {
    let headers: Vec<String> = raw.headers.iter().map(|h| normalize_header(h)).collect();
    let layout = resolve_layout(dataset, &headers)?;

    let mut records = Vec::with_capacity(raw.rows.len());
    for row in &raw.rows {
        let extra_fields = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| {
                *i != layout.first_name && *i != layout.last_name && *i != layout.date_of_birth
            })
            .map(|(i, h)| (h.clone(), cell(row, i).to_string()))
            .collect();
        records.push(PersonRecord {
            first_name: normalize_name(cell(row, layout.first_name)),
            last_name: normalize_name(cell(row, layout.last_name)),
            date_of_birth: mode.parse(cell(row, layout.date_of_birth)),
            extra_fields,
        });
    }

    let ds = Dataset {
        name: dataset.to_string(),
        headers,
        layout,
        records,
    };
    let invalid = ds.invalid_dob_count();
    if invalid > 0 {
        log::debug!(
            "{}: {} of {} rows have an unparsable date of birth",
            dataset,
            invalid,
            ds.len()
        );
    }
    Ok(ds)
}

fn cell(row: &[String], idx: usize) -> &str {
    row.get(idx).map(String::as_str).unwrap_or("")
}

/// Re-apply name normalization to an already built record. Idempotent.
pub fn normalize_record(rec: &PersonRecord) -> PersonRecord {
    PersonRecord {
        first_name: normalize_name(&rec.first_name),
        last_name: normalize_name(&rec.last_name),
        date_of_birth: rec.date_of_birth,
        extra_fields: rec.extra_fields.clone(),
    }
}

/// Build a query from manually entered values (`MM/DD/YYYY` date).
pub fn manual_query(first_name: &str, last_name: &str, dob: &str) -> PersonRecord {
    PersonRecord::new(
        &normalize_name(first_name),
        &normalize_name(last_name),
        DateMode::Strict.parse(dob),
    )
}
