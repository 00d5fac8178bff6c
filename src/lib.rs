pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::toml_config::TomlConfig;

pub use adapters::{CsvTable, HttpFetcher, ScraperParser};
pub use core::{
    batch::{BatchOptions, BatchRunner},
    engine::AuditEngine,
    resolver::{LinkResolver, MatchMode, PrivacyTerms},
};
pub use domain::model::{BatchSummary, ResolutionResult};
pub use utils::error::{AuditError, Result};
