use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Scanner service unavailable: {message}")]
    ServiceUnavailable { message: String },

    #[error("Scan submission rejected{}: {message}", .status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default())]
    SubmissionRejected { status: Option<u16>, message: String },

    #[error("{operation} timed out after {}ms", .after.as_millis())]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("Scan job '{job_id}' not found on the scanner")]
    NotFound { job_id: String },

    #[error("Malformed scan result: {message}")]
    MalformedResult { message: String },

    #[error("Polling budget of {}s exhausted", .budget.as_secs())]
    BudgetExhausted { budget: Duration },

    #[error("Failed to decode {context}: {source}")]
    Decode {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Job store error: {message}")]
    Store { message: String },

    #[error("Job '{job_id}' is not in the job store")]
    UnknownJob { job_id: String },

    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Config file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("Invalid YAML syntax in {} at line {line}, column {column}: {message}", .file.display())]
    YamlSyntaxError {
        file: PathBuf,
        line: usize,
        column: usize,
        message: String,
    },

    #[error("Validation error in config file '{}':\n{}", .file.display(), .errors.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation { file: PathBuf, errors: Vec<String> },
}

impl ScanError {
    /// Whether the poll loop may retry after this error.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ScanError::Timeout { .. } | ScanError::ServiceUnavailable { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
