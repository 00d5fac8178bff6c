use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Column '{column}' not found in table header")]
    ColumnNotFound { column: String },

    #[error("Document could not be parsed: {message}")]
    ParseError { message: String },

    #[error("Write-back to row {row} failed: {message}")]
    WritebackError { row: usize, message: String },

    #[error("Row processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Storage,
    Configuration,
    Data,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AuditError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AuditError::HttpError(_) => ErrorCategory::Network,
            AuditError::CsvError(_) | AuditError::IoError(_) | AuditError::WritebackError { .. } => {
                ErrorCategory::Storage
            }
            AuditError::ConfigError { .. }
            | AuditError::ConfigValidationError { .. }
            | AuditError::InvalidConfigValueError { .. }
            | AuditError::MissingConfigError { .. }
            | AuditError::ColumnNotFound { .. } => ErrorCategory::Configuration,
            AuditError::SerializationError(_)
            | AuditError::ParseError { .. }
            | AuditError::ProcessingError { .. } => ErrorCategory::Data,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            AuditError::ParseError { .. } => ErrorSeverity::Low,
            AuditError::HttpError(_) | AuditError::WritebackError { .. } => ErrorSeverity::Medium,
            AuditError::ProcessingError { .. } | AuditError::SerializationError(_) => {
                ErrorSeverity::High
            }
            AuditError::CsvError(_)
            | AuditError::IoError(_)
            | AuditError::ConfigError { .. }
            | AuditError::ConfigValidationError { .. }
            | AuditError::InvalidConfigValueError { .. }
            | AuditError::MissingConfigError { .. }
            | AuditError::ColumnNotFound { .. } => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            AuditError::HttpError(_) => {
                "Check network connectivity and that the site is reachable".to_string()
            }
            AuditError::CsvError(_) => {
                "Make sure the input file is valid CSV with a header row".to_string()
            }
            AuditError::IoError(_) => {
                "Check that the input file exists and is writable".to_string()
            }
            AuditError::SerializationError(_) => "Check the summary output path".to_string(),
            AuditError::ConfigError { .. }
            | AuditError::ConfigValidationError { .. }
            | AuditError::InvalidConfigValueError { .. } => {
                "Review the configuration file and command-line flags".to_string()
            }
            AuditError::MissingConfigError { field } => {
                format!("Provide a value for '{}'", field)
            }
            AuditError::ColumnNotFound { column } => format!(
                "Use a column letter (A, B, ...) or a header name present in row 1 instead of '{}'",
                column
            ),
            AuditError::ParseError { .. } => {
                "The page is not HTML; nothing to do for this row".to_string()
            }
            AuditError::WritebackError { row, .. } => {
                format!("Re-run the batch for row {} once the table is writable", row)
            }
            AuditError::ProcessingError { .. } => {
                "Re-run with --verbose to see the failing row".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => format!("Network problem: {}", self),
            ErrorCategory::Storage => format!("Could not access the table: {}", self),
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::Data => format!("Unexpected data: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, AuditError>;
