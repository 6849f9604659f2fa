use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::matching::{DEFAULT_THRESHOLD, MatchOptions, Scorer};

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Xlsx,
    Csv,
    Json,
    All,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Xlsx => "xlsx",
            Self::Csv => "csv",
            Self::Json => "json",
            Self::All => "all",
        }
    }

    pub fn writes_xlsx(&self) -> bool {
        matches!(self, Self::Xlsx | Self::All)
    }

    pub fn writes_csv(&self) -> bool {
        matches!(self, Self::Csv | Self::All)
    }

    pub fn writes_json(&self) -> bool {
        matches!(self, Self::Json | Self::All)
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct MatchingConfig {
    pub threshold: u8,
    pub scorer: Scorer,
    pub parallel: bool,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            scorer: Scorer::default(),
            parallel: false,
        }
    }
}

impl MatchingConfig {
    pub fn options(&self) -> MatchOptions {
        MatchOptions {
            threshold: self.threshold,
            scorer: self.scorer,
            parallel: self.parallel,
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct ExportConfig {
    pub out_path: String,
    pub format: ExportFormat,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            out_path: "search_results.xlsx".into(),
            format: ExportFormat::Xlsx,
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct CheckpointConfig {
    pub path: Option<String>,
    pub resume: bool,
    pub every: usize,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            path: None,
            resume: false,
            every: 100,
        }
    }
}

/// Inputs of a batch search.
#[derive(Clone, Serialize, Deserialize, Debug, Default)]
pub struct InputConfig {
    pub haystack: String,
    pub needles: String,
    pub haystack_sheet: Option<String>,
    pub needles_sheet: Option<String>,
}

#[derive(Clone, Serialize, Deserialize, Debug, Default)]
pub struct AppConfig {
    pub input: InputConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub checkpoint: CheckpointConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.input.haystack.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "input.haystack",
            });
        }
        if self.input.needles.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "input.needles",
            });
        }
        if self.matching.threshold > 100 {
            return Err(ConfigError::InvalidValue {
                field: "matching.threshold",
                reason: format!("{} not in 0..=100", self.matching.threshold),
            });
        }
        if self.export.out_path.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "export.out_path",
            });
        }
        if self.checkpoint.every == 0 {
            return Err(ConfigError::InvalidValue {
                field: "checkpoint.every",
                reason: "must be > 0".into(),
            });
        }
        if self.checkpoint.resume && self.checkpoint.path.is_none() {
            return Err(ConfigError::MissingField {
                field: "checkpoint.path",
            });
        }
        Ok(())
    }
}
