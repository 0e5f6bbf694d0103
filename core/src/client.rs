use crate::error::{Result, ScanError};
use crate::http::{HttpClient, HttpResponse};
use crate::service::ScanService;
use crate::types::{ScanOptions, ScanRequest, ScanType, Tier};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Per-call deadlines for the scanner endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScannerTimeouts {
    pub submit: Duration,
    pub status: Duration,
    pub cancel: Duration,
    pub health: Duration,
}

impl Default for ScannerTimeouts {
    fn default() -> Self {
        Self {
            submit: Duration::from_secs(30),
            status: Duration::from_secs(15),
            cancel: Duration::from_secs(10),
            health: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScannerClient {
    http: HttpClient,
    timeouts: ScannerTimeouts,
}

impl ScannerClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            http: HttpClient::new(base_url)?,
            timeouts: ScannerTimeouts::default(),
        })
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.http = self.http.with_api_key(api_key);
        self
    }

    pub fn with_timeouts(mut self, timeouts: ScannerTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    fn job_path(job_id: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(job_id.as_bytes()).collect();
        format!("jobs/{}", encoded)
    }
}

#[async_trait]
impl ScanService for ScannerClient {
    async fn health(&self) -> Result<()> {
        let response = self
            .http
            .get("health", self.timeouts.health, "health probe")
            .await
            .map_err(|e| match e {
                ScanError::Timeout { .. } | ScanError::ServiceUnavailable { .. } => {
                    ScanError::ServiceUnavailable {
                        message: e.to_string(),
                    }
                }
                other => other,
            })?;

        if !response.is_success() {
            return Err(ScanError::ServiceUnavailable {
                message: format!("health probe returned HTTP {}", response.status.as_u16()),
            });
        }

        Ok(())
    }

    async fn submit(&self, request: &ScanRequest) -> Result<Submission> {
        validate_target(&request.url)?;
        self.health().await?;

        let body = SubmitBody {
            url: &request.url,
            tier: request.tier,
            options: SubmitOptions {
                scan_type: request.scan_type,
                options: &request.options,
            },
        };

        let response = self
            .http
            .post("scan/submit", &body, self.timeouts.submit, "scan submission")
            .await?;

        if !response.is_success() {
            return Err(ScanError::SubmissionRejected {
                status: Some(response.status.as_u16()),
                message: rejection_message(&response),
            });
        }

        let parsed: SubmitResponse =
            response
                .json("submit response")
                .map_err(|e| ScanError::SubmissionRejected {
                    status: None,
                    message: e.to_string(),
                })?;

        let job_id = parsed
            .job_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ScanError::SubmissionRejected {
                status: None,
                message: "scanner response did not include a jobId".to_string(),
            })?;

        tracing::info!(job_id = %job_id, url = %request.url, tier = %request.tier, "scan submitted");

        Ok(Submission {
            job_id,
            status: parsed.status.map(RemoteStatus::from),
            estimated_completion: parsed.estimated_completion_time.map(|v| match v {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            }),
            tier: parsed.tier.as_deref().map(Tier::from_remote),
        })
    }

    async fn fetch_status(&self, job_id: &str) -> Result<StatusReport> {
        let response = self
            .http
            .get(&Self::job_path(job_id), self.timeouts.status, "status fetch")
            .await?;

        match response.status {
            StatusCode::NOT_FOUND => Err(ScanError::NotFound {
                job_id: job_id.to_string(),
            }),
            status if status.is_success() => response.json("job status"),
            status => Err(ScanError::ServiceUnavailable {
                message: format!(
                    "status fetch returned HTTP {}: {}",
                    status.as_u16(),
                    rejection_message(&response)
                ),
            }),
        }
    }

    async fn cancel(&self, job_id: &str) -> Result<CancelAck> {
        let response = self
            .http
            .delete(&Self::job_path(job_id), self.timeouts.cancel, "cancel")
            .await?;

        match response.status {
            StatusCode::NOT_FOUND => Err(ScanError::NotFound {
                job_id: job_id.to_string(),
            }),
            status if status.is_success() => {
                Ok(serde_json::from_str(&response.body).unwrap_or_default())
            }
            status => Err(ScanError::ServiceUnavailable {
                message: format!("cancel returned HTTP {}", status.as_u16()),
            }),
        }
    }
}

fn validate_target(raw: &str) -> Result<()> {
    let parsed = url::Url::parse(raw.trim()).map_err(|e| ScanError::InvalidInput {
        message: format!("'{}' is not a valid URL: {}", raw, e),
    })?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ScanError::InvalidInput {
            message: format!("unsupported URL scheme '{}'", parsed.scheme()),
        });
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(ScanError::InvalidInput {
            message: format!("'{}' has no host", raw),
        });
    }

    Ok(())
}

fn rejection_message(response: &HttpResponse) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<String>,
        message: Option<String>,
        details: Option<serde_json::Value>,
    }

    if let Ok(body) = serde_json::from_str::<ErrorBody>(&response.body) {
        if let Some(error) = body.error.or(body.message) {
            return match body.details {
                Some(serde_json::Value::String(details)) => format!("{} ({})", error, details),
                Some(serde_json::Value::Null) | None => error,
                Some(details) => format!("{} ({})", error, details),
            };
        }
    }

    let text = response.body.trim();
    if text.is_empty() {
        response
            .status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string()
    } else {
        text.to_string()
    }
}

#[derive(Serialize)]
struct SubmitBody<'a> {
    url: &'a str,
    tier: Tier,
    options: SubmitOptions<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitOptions<'a> {
    scan_type: ScanType,
    #[serde(flatten)]
    options: &'a ScanOptions,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitResponse {
    job_id: Option<String>,
    status: Option<String>,
    estimated_completion_time: Option<serde_json::Value>,
    tier: Option<String>,
}

/// A job accepted by the scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub job_id: String,
    pub status: Option<RemoteStatus>,
    pub estimated_completion: Option<String>,
    pub tier: Option<Tier>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelAck {
    pub job_id: Option<String>,
    pub status: Option<String>,
    pub message: Option<String>,
}

/// Job state as the scanner names it. Unrecognised values are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RemoteStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Canceled,
    Timeout,
    Other(String),
}

impl RemoteStatus {
    pub fn as_str(&self) -> &str {
        match self {
            RemoteStatus::Queued => "queued",
            RemoteStatus::Running => "running",
            RemoteStatus::Completed => "completed",
            RemoteStatus::Failed => "failed",
            RemoteStatus::Canceled => "canceled",
            RemoteStatus::Timeout => "timeout",
            RemoteStatus::Other(raw) => raw,
        }
    }
}

impl From<String> for RemoteStatus {
    fn from(raw: String) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "queued" => RemoteStatus::Queued,
            "running" => RemoteStatus::Running,
            "completed" => RemoteStatus::Completed,
            "failed" => RemoteStatus::Failed,
            "canceled" | "cancelled" => RemoteStatus::Canceled,
            "timeout" => RemoteStatus::Timeout,
            _ => RemoteStatus::Other(raw),
        }
    }
}

impl From<RemoteStatus> for String {
    fn from(status: RemoteStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for RemoteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of `GET /jobs/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub status: RemoteStatus,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub result: Option<RawResult>,
}

impl StatusReport {
    /// Remote progress clamped to 0..=100.
    pub fn progress(&self) -> f64 {
        self.progress
            .filter(|p| p.is_finite())
            .unwrap_or(0.0)
            .clamp(0.0, 100.0)
    }
}

/// Terminal payload of a completed job, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawResult {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub violation_count: Option<u64>,
    #[serde(default)]
    pub violations: Vec<RawViolation>,
}

/// One violation as emitted by the scanner's engines. Field names differ
/// between engines, so every alternative spelling is accepted separately.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawViolation {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub impact: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub selector: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub cross_validated: Option<bool>,
    #[serde(default)]
    pub engines: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_status_keeps_unknown_values() {
        let report: StatusReport =
            serde_json::from_str(r#"{"status":"warming_up","progress":5}"#).unwrap();
        assert_eq!(report.status, RemoteStatus::Other("warming_up".to_string()));
        assert_eq!(report.status.as_str(), "warming_up");

        let report: StatusReport = serde_json::from_str(r#"{"status":"cancelled"}"#).unwrap();
        assert_eq!(report.status, RemoteStatus::Canceled);
        assert_eq!(report.progress(), 0.0);
    }

    #[test]
    fn test_progress_is_clamped() {
        let report: StatusReport =
            serde_json::from_str(r#"{"status":"running","progress":140.5}"#).unwrap();
        assert_eq!(report.progress(), 100.0);

        let report: StatusReport =
            serde_json::from_str(r#"{"status":"running","progress":-3}"#).unwrap();
        assert_eq!(report.progress(), 0.0);
    }

    #[test]
    fn test_validate_target() {
        assert!(validate_target("https://example.com").is_ok());
        assert!(validate_target("http://localhost:8080/page").is_ok());
        assert!(matches!(
            validate_target("not a url"),
            Err(ScanError::InvalidInput { .. })
        ));
        assert!(matches!(
            validate_target("ftp://example.com"),
            Err(ScanError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_submit_body_shape() {
        let options = ScanOptions {
            max_pages: Some(10),
            ..ScanOptions::default()
        };
        let body = SubmitBody {
            url: "https://example.com",
            tier: Tier::Starter,
            options: SubmitOptions {
                scan_type: ScanType::MultiPage,
                options: &options,
            },
        };

        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "url": "https://example.com",
                "tier": "starter",
                "options": {
                    "scanType": "multi_page",
                    "maxPages": 10,
                    "includeWarnings": false
                }
            })
        );
    }

    #[test]
    fn test_job_path_is_encoded() {
        assert_eq!(ScannerClient::job_path("abc-123"), "jobs/abc-123");
        assert_eq!(ScannerClient::job_path("a/b"), "jobs/a%2Fb");
    }
}
