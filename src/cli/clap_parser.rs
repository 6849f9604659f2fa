use crate::config::{
    AppConfig, CheckpointConfig, ExportConfig, ExportFormat, InputConfig, MatchingConfig,
};
use crate::error::ConfigError;
use crate::matching::{DEFAULT_THRESHOLD, MatchOptions, Scorer};
use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, ValueEnum, Debug)]
pub enum FormatOpt {
    Xlsx,
    Csv,
    Json,
    All,
}

impl From<FormatOpt> for ExportFormat {
    fn from(f: FormatOpt) -> Self {
        match f {
            FormatOpt::Xlsx => Self::Xlsx,
            FormatOpt::Csv => Self::Csv,
            FormatOpt::Json => Self::Json,
            FormatOpt::All => Self::All,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, ValueEnum, Debug)]
pub enum ScorerOpt {
    Ratio,
    Levenshtein,
    JaroWinkler,
}

impl From<ScorerOpt> for Scorer {
    fn from(s: ScorerOpt) -> Self {
        match s {
            ScorerOpt::Ratio => Self::Ratio,
            ScorerOpt::Levenshtein => Self::Levenshtein,
            ScorerOpt::JaroWinkler => Self::JaroWinkler,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "dataset_search",
    version,
    about = "Find needle records in a haystack dataset by date of birth and fuzzy name match",
    disable_help_subcommand = true
)]
pub struct Cli {
    /// Debug-level logging
    #[arg(long, short, global = true, conflicts_with = "quiet")]
    pub verbose: bool,
    /// Only warnings and errors
    #[arg(long, short, global = true)]
    pub quiet: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Search every needle row in the haystack and export the results
    Search(SearchArgs),
    /// Look up a single person in the haystack
    Lookup(LookupArgs),
    /// Write a commented .env template
    EnvTemplate {
        #[arg(value_name = "PATH", default_value = ".env.template")]
        path: String,
    },
}

#[derive(Args, Debug, Clone)]
pub struct ScoringArgs {
    /// Minimum score (0-100) both names must reach (env: DATASET_SEARCH_THRESHOLD)
    #[arg(
        long,
        env = "DATASET_SEARCH_THRESHOLD",
        default_value_t = DEFAULT_THRESHOLD,
        value_parser = clap::value_parser!(u8).range(0..=100)
    )]
    pub threshold: u8,
    /// Name similarity metric (env: DATASET_SEARCH_SCORER)
    #[arg(long, value_enum, env = "DATASET_SEARCH_SCORER", default_value_t = ScorerOpt::Ratio)]
    pub scorer: ScorerOpt,
}

#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    /// Reference dataset (csv, tsv, xlsx, xlsm, xls, ods)
    #[arg(long, value_name = "PATH")]
    pub haystack: String,
    /// Records to look for
    #[arg(long, value_name = "PATH")]
    pub needles: String,
    /// Worksheet of the haystack workbook (first sheet when omitted)
    #[arg(long, value_name = "NAME")]
    pub haystack_sheet: Option<String>,
    /// Worksheet of the needles workbook (first sheet when omitted)
    #[arg(long, value_name = "NAME")]
    pub needles_sheet: Option<String>,
    /// Output path (env: DATASET_SEARCH_OUT)
    #[arg(
        long,
        value_name = "PATH",
        env = "DATASET_SEARCH_OUT",
        default_value = "search_results.xlsx"
    )]
    pub out: String,
    /// Output format (env: DATASET_SEARCH_FORMAT)
    #[arg(long, value_enum, env = "DATASET_SEARCH_FORMAT", default_value_t = FormatOpt::Xlsx)]
    pub format: FormatOpt,
    #[command(flatten)]
    pub scoring: ScoringArgs,
    /// Evaluate queries on all cores (env: DATASET_SEARCH_PARALLEL)
    #[arg(long, env = "DATASET_SEARCH_PARALLEL")]
    pub parallel: bool,
    /// Checkpoint file for resumable runs (env: DATASET_SEARCH_CHECKPOINT)
    #[arg(long, value_name = "PATH", env = "DATASET_SEARCH_CHECKPOINT")]
    pub checkpoint: Option<String>,
    /// Continue from the checkpoint file
    #[arg(long, requires = "checkpoint")]
    pub resume: bool,
    /// Save progress after this many queries. Every save rewrites all results so
    /// far, so very small values get slow on large needle files.
    #[arg(long, value_name = "N", default_value_t = 100)]
    pub checkpoint_every: usize,
}

#[derive(Args, Debug, Clone)]
pub struct LookupArgs {
    #[arg(long, value_name = "PATH")]
    pub haystack: String,
    #[arg(long, value_name = "NAME")]
    pub haystack_sheet: Option<String>,
    #[arg(long)]
    pub first_name: String,
    #[arg(long)]
    pub last_name: String,
    /// Date of birth as MM/DD/YYYY
    #[arg(long, value_name = "MM/DD/YYYY")]
    pub dob: String,
    #[command(flatten)]
    pub scoring: ScoringArgs,
    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

impl ScoringArgs {
    pub fn options(&self) -> MatchOptions {
        MatchOptions {
            threshold: self.threshold,
            scorer: self.scorer.into(),
            parallel: false,
        }
    }
}

impl SearchArgs {
    pub fn to_app_config(&self) -> Result<AppConfig, ConfigError> {
        let cfg = AppConfig {
            input: InputConfig {
                haystack: self.haystack.clone(),
                needles: self.needles.clone(),
                haystack_sheet: self.haystack_sheet.clone(),
                needles_sheet: self.needles_sheet.clone(),
            },
            matching: MatchingConfig {
                threshold: self.scoring.threshold,
                scorer: self.scoring.scorer.into(),
                parallel: self.parallel,
            },
            export: ExportConfig {
                out_path: self.out.clone(),
                format: self.format.into(),
            },
            checkpoint: CheckpointConfig {
                path: self.checkpoint.clone(),
                resume: self.resume,
                every: self.checkpoint_every,
            },
        };
        cfg.validate()?;
        Ok(cfg)
    }
}
