use crate::adapters::{DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};
use crate::config::{
    default_terms, validate_provider, DEFAULT_CONCURRENCY, DEFAULT_RESULT_COLUMN, DEFAULT_URL_COLUMN,
};
use crate::domain::model::RowRange;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{AuditError, Result};
use crate::utils::validation::Validate;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub source: SourceConfig,
    pub resolver: Option<ResolverConfig>,
    pub batch: Option<BatchConfig>,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub path: String,
    pub url_column: Option<String>,
    pub result_column: Option<String>,
    pub first_row: Option<usize>,
    pub last_row: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolverConfig {
    pub privacy_terms: Option<Vec<String>>,
    pub timeout_seconds: Option<u64>,
    pub user_agent: Option<String>,
    pub collect_all: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchConfig {
    pub concurrency: Option<usize>,
    pub skip_resolved: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub verbose: Option<bool>,
    pub progress: Option<bool>,
    pub json_logs: Option<bool>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(AuditError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| AuditError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${SITES_CSV})；未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| AuditError::ConfigError {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    fn resolver_mut(&mut self) -> &mut ResolverConfig {
        self.resolver.get_or_insert_with(ResolverConfig::default)
    }

    fn batch_mut(&mut self) -> &mut BatchConfig {
        self.batch.get_or_insert_with(BatchConfig::default)
    }

    fn monitoring_mut(&mut self) -> &mut MonitoringConfig {
        self.monitoring.get_or_insert_with(MonitoringConfig::default)
    }

    /// 命令列明確給定的值覆蓋檔案中的設定
    #[cfg(feature = "cli")]
    pub fn apply_overrides(&mut self, cli: &crate::config::CliConfig) {
        if let Some(input) = &cli.input {
            self.source.path = input.clone();
        }
        if let Some(column) = &cli.url_column {
            self.source.url_column = Some(column.clone());
        }
        if let Some(column) = &cli.result_column {
            self.source.result_column = Some(column.clone());
        }
        if cli.first_row.is_some() {
            self.source.first_row = cli.first_row;
        }
        if cli.last_row.is_some() {
            self.source.last_row = cli.last_row;
        }
        if !cli.terms.is_empty() {
            self.resolver_mut().privacy_terms = Some(cli.terms.clone());
        }
        if cli.timeout_secs.is_some() {
            self.resolver_mut().timeout_seconds = cli.timeout_secs;
        }
        if let Some(user_agent) = &cli.user_agent {
            self.resolver_mut().user_agent = Some(user_agent.clone());
        }
        if cli.collect_all {
            self.resolver_mut().collect_all = Some(true);
        }
        if cli.concurrency.is_some() {
            self.batch_mut().concurrency = cli.concurrency;
        }
        if cli.skip_resolved {
            self.batch_mut().skip_resolved = Some(true);
        }
        if cli.verbose {
            self.monitoring_mut().verbose = Some(true);
        }
        if cli.progress {
            self.monitoring_mut().progress = Some(true);
        }
        if cli.json_logs {
            self.monitoring_mut().json_logs = Some(true);
        }
    }

    pub fn verbose(&self) -> bool {
        self.monitoring.as_ref().and_then(|m| m.verbose).unwrap_or(false)
    }

    pub fn progress(&self) -> bool {
        self.monitoring.as_ref().and_then(|m| m.progress).unwrap_or(false)
    }

    pub fn json_logs(&self) -> bool {
        self.monitoring.as_ref().and_then(|m| m.json_logs).unwrap_or(false)
    }
}

impl ConfigProvider for TomlConfig {
    fn source_path(&self) -> &str {
        &self.source.path
    }

    fn url_column(&self) -> &str {
        self.source.url_column.as_deref().unwrap_or(DEFAULT_URL_COLUMN)
    }

    fn result_column(&self) -> &str {
        self.source
            .result_column
            .as_deref()
            .unwrap_or(DEFAULT_RESULT_COLUMN)
    }

    fn privacy_terms(&self) -> Vec<String> {
        self.resolver
            .as_ref()
            .and_then(|r| r.privacy_terms.clone())
            .unwrap_or_else(default_terms)
    }

    fn timeout_secs(&self) -> u64 {
        self.resolver
            .as_ref()
            .and_then(|r| r.timeout_seconds)
            .unwrap_or(DEFAULT_TIMEOUT_SECS)
    }

    fn user_agent(&self) -> &str {
        self.resolver
            .as_ref()
            .and_then(|r| r.user_agent.as_deref())
            .unwrap_or(DEFAULT_USER_AGENT)
    }

    fn concurrency(&self) -> usize {
        self.batch
            .as_ref()
            .and_then(|b| b.concurrency)
            .unwrap_or(DEFAULT_CONCURRENCY)
    }

    fn skip_resolved(&self) -> bool {
        self.batch
            .as_ref()
            .and_then(|b| b.skip_resolved)
            .unwrap_or(false)
    }

    fn collect_all(&self) -> bool {
        self.resolver
            .as_ref()
            .and_then(|r| r.collect_all)
            .unwrap_or(false)
    }

    fn row_range(&self) -> RowRange {
        RowRange {
            first: self.source.first_row.unwrap_or(1),
            last: self.source.last_row,
        }
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        validate_provider(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[source]
path = "sites.csv"
url_column = "website"
result_column = "privacy_url"
first_row = 2
last_row = 40

[resolver]
privacy_terms = ["Privacy", "политика конфиденциальности", "конфиденциальность"]
timeout_seconds = 15
collect_all = true

[batch]
concurrency = 4
skip_resolved = true

[monitoring]
progress = true
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.source_path(), "sites.csv");
        assert_eq!(config.url_column(), "website");
        assert_eq!(config.result_column(), "privacy_url");
        assert_eq!(config.privacy_terms().len(), 3);
        assert_eq!(config.timeout_secs(), 15);
        assert_eq!(config.user_agent(), DEFAULT_USER_AGENT);
        assert_eq!(config.concurrency(), 4);
        assert!(config.skip_resolved());
        assert!(config.collect_all());
        assert!(config.progress());
        assert!(!config.verbose());
        assert_eq!(
            config.row_range(),
            RowRange {
                first: 2,
                last: Some(40)
            }
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = TomlConfig::from_toml_str("[source]\npath = \"sites.csv\"\n").unwrap();

        assert_eq!(config.url_column(), "A");
        assert_eq!(config.result_column(), "B");
        assert_eq!(config.privacy_terms(), default_terms());
        assert_eq!(config.timeout_secs(), 10);
        assert_eq!(config.concurrency(), 1);
        assert!(!config.skip_resolved());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("PLF_TEST_SITES_PATH", "/data/sites.csv");

        let config = TomlConfig::from_toml_str("[source]\npath = \"${PLF_TEST_SITES_PATH}\"\n").unwrap();
        assert_eq!(config.source_path(), "/data/sites.csv");

        std::env::remove_var("PLF_TEST_SITES_PATH");
    }

    #[test]
    fn test_config_validation() {
        let empty_terms = r#"
[source]
path = "sites.csv"

[resolver]
privacy_terms = ["", "  "]
"#;
        let config = TomlConfig::from_toml_str(empty_terms).unwrap();
        assert!(config.validate().is_err());

        let bad_rows = r#"
[source]
path = "sites.csv"
first_row = 10
last_row = 2
"#;
        let config = TomlConfig::from_toml_str(bad_rows).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = TomlConfig::from_toml_str("[source\npath = ").unwrap_err();
        assert!(matches!(err, AuditError::ConfigValidationError { .. }));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[source]\npath = \"from-file.csv\"\n")
            .unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.source_path(), "from-file.csv");
    }

    #[cfg(feature = "cli")]
    #[test]
    fn test_cli_overrides_file_values() {
        use clap::Parser;

        let mut config = TomlConfig::from_toml_str(
            "[source]\npath = \"sites.csv\"\n\n[batch]\nconcurrency = 2\n",
        )
        .unwrap();
        let cli = crate::config::CliConfig::try_parse_from([
            "privacy-link-finder",
            "--input",
            "other.csv",
            "--concurrency",
            "5",
            "--skip-resolved",
        ])
        .unwrap();

        config.apply_overrides(&cli);

        assert_eq!(config.source_path(), "other.csv");
        assert_eq!(config.concurrency(), 5);
        assert!(config.skip_resolved());
        assert_eq!(config.result_column(), "B");
    }
}
