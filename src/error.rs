use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// A dataset lacks one or more of the columns the matcher depends on.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{dataset} dataset is missing required columns: {}", missing.join(", "))]
pub struct SchemaError {
    pub dataset: String,
    pub missing: Vec<String>,
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse delimited file {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
    #[error("failed to read workbook {path}: {reason}")]
    Workbook { path: String, reason: String },
    #[error("{path} has no header row")]
    Empty { path: String },
    #[error("unsupported input format for {path} (expected csv, tsv, xlsx, xlsm, xls or ods)")]
    UnsupportedFormat { path: String },
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("csv export error: {0}")]
    Csv(String),
    #[error("xlsx export error: {0}")]
    Xlsx(String),
    #[error("json export error: {0}")]
    Json(String),
}

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("checkpoint io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("checkpoint at {path} is corrupt: {reason}")]
    Corrupt { path: String, reason: String },
    #[error("checkpoint belongs to job '{found}', current job is '{expected}'")]
    JobMismatch { expected: String, found: String },
}
