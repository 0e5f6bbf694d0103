//! YAML configuration with environment overrides.
//!
//! ```yaml
//! scanner:
//!   base_url: https://scanner.internal:8080
//!   api_key: secret
//!   timeouts:
//!     submit_secs: 30
//!     status_secs: 15
//!     cancel_secs: 10
//!     health_secs: 5
//! polling:
//!   initial_interval_ms: 2000
//!   multiplier: 1.5
//!   max_interval_ms: 10000
//!   budget_secs: 180
//!   final_window_secs: 5
//! store:
//!   kind: file
//!   dir: .scanrelay/jobs
//! ```

use crate::backoff::BackoffPolicy;
use crate::client::{ScannerClient, ScannerTimeouts};
use crate::error::{Result, ScanError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "scanrelay.yaml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub scanner: ScannerConfig,
    pub polling: PollingConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScannerConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeouts: TimeoutConfig,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            api_key: None,
            timeouts: TimeoutConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimeoutConfig {
    pub submit_secs: u64,
    pub status_secs: u64,
    pub cancel_secs: u64,
    pub health_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        let defaults = ScannerTimeouts::default();
        Self {
            submit_secs: defaults.submit.as_secs(),
            status_secs: defaults.status.as_secs(),
            cancel_secs: defaults.cancel.as_secs(),
            health_secs: defaults.health.as_secs(),
        }
    }
}

impl From<TimeoutConfig> for ScannerTimeouts {
    fn from(config: TimeoutConfig) -> Self {
        Self {
            submit: Duration::from_secs(config.submit_secs),
            status: Duration::from_secs(config.status_secs),
            cancel: Duration::from_secs(config.cancel_secs),
            health: Duration::from_secs(config.health_secs),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PollingConfig {
    pub initial_interval_ms: u64,
    pub multiplier: f64,
    pub max_interval_ms: u64,
    pub budget_secs: u64,
    pub final_window_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        let policy = BackoffPolicy::default();
        Self {
            initial_interval_ms: policy.initial.as_millis() as u64,
            multiplier: policy.multiplier,
            max_interval_ms: policy.ceiling.as_millis() as u64,
            budget_secs: policy.budget.as_secs(),
            final_window_secs: policy.final_window.as_secs(),
        }
    }
}

impl From<PollingConfig> for BackoffPolicy {
    fn from(config: PollingConfig) -> Self {
        Self {
            initial: Duration::from_millis(config.initial_interval_ms),
            multiplier: config.multiplier,
            ceiling: Duration::from_millis(config.max_interval_ms),
            budget: Duration::from_secs(config.budget_secs),
            final_window: Duration::from_secs(config.final_window_secs),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Memory,
    #[default]
    File,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub kind: StoreKind,
    pub dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::default(),
            dir: PathBuf::from(".scanrelay/jobs"),
        }
    }
}

impl Config {
    /// Loads `path`, or the defaults when `path` is `None` and no
    /// `scanrelay.yaml` exists in the working directory. Environment
    /// overrides are applied and the result validated.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (mut config, source) = match path {
            Some(path) => (Self::from_file(path)?, path.to_path_buf()),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    (Self::from_file(default_path)?, default_path.to_path_buf())
                } else {
                    (Self::default(), PathBuf::from("<defaults>"))
                }
            }
        };

        config.apply_env();
        config.validate(&source)?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ScanError::ConfigNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content, path)
    }

    pub fn from_yaml_str(content: &str, file: &Path) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(content).map_err(|e| match e.location() {
            Some(location) => ScanError::YamlSyntaxError {
                file: file.to_path_buf(),
                line: location.line(),
                column: location.column(),
                message: e.to_string(),
            },
            None => ScanError::Config {
                message: e.to_string(),
            },
        })
    }

    pub fn apply_env(&mut self) {
        if let Some(base_url) = env_value("SCANRELAY_BASE_URL") {
            self.scanner.base_url = base_url;
        }
        if let Some(api_key) = env_value("SCANRELAY_API_KEY") {
            self.scanner.api_key = Some(api_key);
        }
        if let Some(dir) = env_value("SCANRELAY_STORE_DIR") {
            self.store.kind = StoreKind::File;
            self.store.dir = PathBuf::from(dir);
        }
    }

    /// Collects every problem instead of stopping at the first.
    pub fn validate(&self, file: &Path) -> Result<()> {
        let mut errors = Vec::new();

        match url::Url::parse(&self.scanner.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => errors.push(format!(
                "scanner.base_url must be http or https, got '{}'",
                url.scheme()
            )),
            Err(e) => errors.push(format!(
                "scanner.base_url '{}' is invalid: {}",
                self.scanner.base_url, e
            )),
        }

        let timeouts = &self.scanner.timeouts;
        for (name, value) in [
            ("submit_secs", timeouts.submit_secs),
            ("status_secs", timeouts.status_secs),
            ("cancel_secs", timeouts.cancel_secs),
            ("health_secs", timeouts.health_secs),
        ] {
            if value == 0 {
                errors.push(format!("scanner.timeouts.{} must be greater than 0", name));
            }
        }

        let polling = &self.polling;
        if polling.initial_interval_ms == 0 {
            errors.push("polling.initial_interval_ms must be greater than 0".to_string());
        }
        if !(polling.multiplier.is_finite() && polling.multiplier >= 1.0) {
            errors.push(format!(
                "polling.multiplier must be at least 1.0, got {}",
                polling.multiplier
            ));
        }
        if polling.max_interval_ms < polling.initial_interval_ms {
            errors.push("polling.max_interval_ms must not be below initial_interval_ms".to_string());
        }
        if polling.budget_secs == 0 {
            errors.push("polling.budget_secs must be greater than 0".to_string());
        }
        if polling.final_window_secs >= polling.budget_secs {
            errors.push("polling.final_window_secs must be shorter than budget_secs".to_string());
        }

        if self.store.kind == StoreKind::File && self.store.dir.as_os_str().is_empty() {
            errors.push("store.dir is required for the file store".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ScanError::Validation {
                file: file.to_path_buf(),
                errors,
            })
        }
    }

    pub fn backoff_policy(&self) -> BackoffPolicy {
        self.polling.into()
    }

    pub fn scanner_client(&self) -> Result<ScannerClient> {
        Ok(ScannerClient::new(&self.scanner.base_url)?
            .with_api_key(self.scanner.api_key.clone())
            .with_timeouts(self.scanner.timeouts.into()))
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate(Path::new("<defaults>")).unwrap();

        let policy = config.backoff_policy();
        assert_eq!(policy, BackoffPolicy::default());
        assert_eq!(
            ScannerTimeouts::from(config.scanner.timeouts),
            ScannerTimeouts::default()
        );
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
scanner:
  base_url: https://scanner.example.com
polling:
  budget_secs: 60
store:
  kind: memory
"#;
        let config = Config::from_yaml_str(yaml, Path::new("test.yaml")).unwrap();

        assert_eq!(config.scanner.base_url, "https://scanner.example.com");
        assert_eq!(config.scanner.timeouts.status_secs, 15);
        assert_eq!(config.polling.budget_secs, 60);
        assert_eq!(config.polling.initial_interval_ms, 2000);
        assert_eq!(config.store.kind, StoreKind::Memory);
    }

    #[test]
    fn test_unknown_key_reports_location() {
        let yaml = "scanner:\n  base_ur: https://scanner.example.com\n";
        let err = Config::from_yaml_str(yaml, Path::new("bad.yaml")).unwrap_err();

        assert!(err.to_string().contains("base_ur"), "{}", err);
        if let ScanError::YamlSyntaxError { file, line, .. } = err {
            assert_eq!(file, PathBuf::from("bad.yaml"));
            assert!(line >= 1);
        }
    }

    #[test]
    fn test_validation_collects_all_errors() {
        let mut config = Config::default();
        config.scanner.base_url = "ftp://scanner".to_string();
        config.scanner.timeouts.status_secs = 0;
        config.polling.multiplier = 0.5;
        config.polling.final_window_secs = 500;

        let err = config.validate(Path::new("scanrelay.yaml")).unwrap_err();
        match err {
            ScanError::Validation { errors, .. } => assert_eq!(errors.len(), 4),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_file() {
        let err = Config::from_file(Path::new("/definitely/not/here.yaml")).unwrap_err();
        assert!(matches!(err, ScanError::ConfigNotFound(_)));
    }
}
