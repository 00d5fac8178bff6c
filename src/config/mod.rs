pub mod toml_config;

use crate::adapters::{DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};
use crate::core::resolver::DEFAULT_PRIVACY_TERMS;
use crate::domain::model::RowRange;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation;
#[cfg(feature = "cli")]
use crate::utils::validation::Validate;
#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use serde::{Deserialize, Serialize};

pub const DEFAULT_URL_COLUMN: &str = "A";
pub const DEFAULT_RESULT_COLUMN: &str = "B";
pub const DEFAULT_CONCURRENCY: usize = 1;
pub const MAX_CONCURRENCY: usize = 32;
pub const MAX_TIMEOUT_SECS: u64 = 300;
pub const SUPPORTED_EXTENSIONS: &[&str] = &["csv", "tsv"];

pub fn default_terms() -> Vec<String> {
    DEFAULT_PRIVACY_TERMS.iter().map(|t| t.to_string()).collect()
}

/// 任何 ConfigProvider 共用的檢查
pub fn validate_provider<C: ConfigProvider + ?Sized>(config: &C) -> Result<()> {
    validation::validate_path("source.path", config.source_path())?;
    validation::validate_file_extension("source.path", config.source_path(), SUPPORTED_EXTENSIONS)?;
    validation::validate_non_empty_string("source.url_column", config.url_column())?;
    validation::validate_non_empty_string("source.result_column", config.result_column())?;

    let range = config.row_range();
    validation::validate_row_bounds("source.first_row", range.first, range.last)?;

    validation::validate_terms("resolver.privacy_terms", &config.privacy_terms())?;
    validation::validate_range("resolver.timeout_seconds", config.timeout_secs(), 1, MAX_TIMEOUT_SECS)?;
    validation::validate_non_empty_string("resolver.user_agent", config.user_agent())?;
    validation::validate_range("batch.concurrency", config.concurrency(), 1, MAX_CONCURRENCY)?;

    Ok(())
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Default, Serialize, Deserialize, Parser)]
#[command(name = "privacy-link-finder")]
#[command(about = "Find the privacy policy link of every site listed in a CSV table")]
pub struct CliConfig {
    /// CSV/TSV file: header on row 1, one site URL per row below it
    #[arg(short, long)]
    pub input: Option<String>,

    /// TOML configuration file; flags given here override its values
    #[arg(short, long)]
    pub config: Option<String>,

    /// Column holding the site URLs (letter or header name)
    #[arg(long)]
    pub url_column: Option<String>,

    /// Column receiving the results (letter or header name, added if missing)
    #[arg(long)]
    pub result_column: Option<String>,

    /// Privacy terms matched against link text and href
    #[arg(long, value_delimiter = ',')]
    pub terms: Vec<String>,

    #[arg(long)]
    pub timeout_secs: Option<u64>,

    #[arg(long)]
    pub user_agent: Option<String>,

    /// Sites fetched at the same time; results are still written in row order
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Skip rows whose result cell is already filled
    #[arg(long)]
    pub skip_resolved: bool,

    /// Write every candidate link instead of only the first
    #[arg(long)]
    pub collect_all: bool,

    /// First data row to process (1 = the row right below the header)
    #[arg(long)]
    pub first_row: Option<usize>,

    #[arg(long)]
    pub last_row: Option<usize>,

    #[arg(long, help = "Show a progress bar")]
    pub progress: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,

    /// List the rows that would be checked without fetching anything
    #[arg(long)]
    pub dry_run: bool,

    /// Write the run summary as JSON to this path
    #[arg(long)]
    pub summary_json: Option<String>,
}

#[cfg(feature = "cli")]
impl ConfigProvider for CliConfig {
    fn source_path(&self) -> &str {
        self.input.as_deref().unwrap_or_default()
    }

    fn url_column(&self) -> &str {
        self.url_column.as_deref().unwrap_or(DEFAULT_URL_COLUMN)
    }

    fn result_column(&self) -> &str {
        self.result_column.as_deref().unwrap_or(DEFAULT_RESULT_COLUMN)
    }

    fn privacy_terms(&self) -> Vec<String> {
        if self.terms.is_empty() {
            default_terms()
        } else {
            self.terms.clone()
        }
    }

    fn timeout_secs(&self) -> u64 {
        self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)
    }

    fn user_agent(&self) -> &str {
        self.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT)
    }

    fn concurrency(&self) -> usize {
        self.concurrency.unwrap_or(DEFAULT_CONCURRENCY)
    }

    fn skip_resolved(&self) -> bool {
        self.skip_resolved
    }

    fn collect_all(&self) -> bool {
        self.collect_all
    }

    fn row_range(&self) -> RowRange {
        RowRange {
            first: self.first_row.unwrap_or(1),
            last: self.last_row,
        }
    }
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_required_field("input", &self.input)?;
        validate_provider(self)
    }
}
