use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::scan::{ScanRequest, ScanType, Tier};
use crate::report::ScanReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Submitted,
    Queued,
    Running,
    Completed,
    Failed,
    Canceled,
    Timeout,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        match self {
            JobStatus::Submitted | JobStatus::Queued | JobStatus::Running => false,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Canceled | JobStatus::Timeout => {
                true
            }
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Submitted => write!(f, "submitted"),
            JobStatus::Queued => write!(f, "queued"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
            JobStatus::Canceled => write!(f, "canceled"),
            JobStatus::Timeout => write!(f, "timeout"),
        }
    }
}

/// Why a terminal job did not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The scanner itself reported failed, canceled or timeout.
    Remote,
    /// The local polling budget ran out.
    BudgetExhausted,
    /// The scanner no longer knows the job.
    NotFound,
    /// The scanner reported completion with an unusable payload.
    MalformedResult,
    /// A non-transient transport error ended polling.
    Transport,
    /// The caller canceled the job.
    Canceled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanJob {
    pub job_id: String,
    pub url: String,
    pub scan_type: ScanType,
    pub tier: Tier,
    pub submitted_at: DateTime<Utc>,
    pub status: JobStatus,
    pub progress: u8,
    pub message: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub failure: Option<FailureKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_completion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<ScanReport>,
}

impl ScanJob {
    pub fn new(job_id: impl Into<String>, request: &ScanRequest) -> Self {
        Self {
            job_id: job_id.into(),
            url: request.url.clone(),
            scan_type: request.scan_type,
            tier: request.tier,
            submitted_at: Utc::now(),
            status: JobStatus::Submitted,
            progress: 0,
            message: None,
            completed_at: None,
            error: None,
            failure: None,
            estimated_completion: None,
            report: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Applies a patch and reports whether anything was written.
    ///
    /// Terminal jobs ignore every patch. Progress never moves backwards.
    pub fn apply(&mut self, patch: JobPatch) -> bool {
        if self.is_terminal() {
            return false;
        }

        if let Some(progress) = patch.progress {
            self.progress = self.progress.max(progress.min(100));
        }
        if let Some(message) = patch.message {
            self.message = Some(message);
        }
        if let Some(error) = patch.error {
            self.error = Some(error);
        }
        if let Some(failure) = patch.failure {
            self.failure = Some(failure);
        }
        if let Some(report) = patch.report {
            self.report = Some(report);
        }
        if let Some(status) = patch.status {
            if status != JobStatus::Submitted {
                self.status = status;
            }
            if status.is_terminal() {
                self.completed_at = Some(patch.completed_at.unwrap_or_else(Utc::now));
            }
        }

        true
    }
}

/// A partial update to a persisted [`ScanJob`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobPatch {
    pub status: Option<JobStatus>,
    pub progress: Option<u8>,
    pub message: Option<String>,
    pub error: Option<String>,
    pub failure: Option<FailureKind>,
    pub completed_at: Option<DateTime<Utc>>,
    pub report: Option<ScanReport>,
}

impl JobPatch {
    pub fn progress(status: JobStatus, progress: u8, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            progress: Some(progress),
            message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn completed(report: ScanReport) -> Self {
        Self {
            status: Some(JobStatus::Completed),
            progress: Some(100),
            message: Some("Scan complete".to_string()),
            completed_at: Some(report.scanned_at),
            report: Some(report),
            ..Self::default()
        }
    }

    pub fn failed(status: JobStatus, failure: FailureKind, error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            status: Some(status),
            message: Some(error.clone()),
            error: Some(error),
            failure: Some(failure),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> ScanJob {
        ScanJob::new("job-1", &ScanRequest::new("https://example.com"))
    }

    #[test]
    fn test_progress_never_decreases() {
        let mut job = job();
        assert!(job.apply(JobPatch::progress(JobStatus::Running, 55, "checks")));
        job.apply(JobPatch::progress(JobStatus::Running, 40, "late tick"));

        assert_eq!(job.progress, 55);
        assert_eq!(job.message.as_deref(), Some("late tick"));
    }

    #[test]
    fn test_terminal_job_ignores_patches() {
        let mut job = job();
        job.apply(JobPatch::failed(
            JobStatus::Failed,
            FailureKind::Remote,
            "page crashed",
        ));
        let completed_at = job.completed_at;
        assert!(completed_at.is_some());

        let changed = job.apply(JobPatch::progress(JobStatus::Running, 80, "resurrected"));

        assert!(!changed);
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.progress, 0);
        assert_eq!(job.completed_at, completed_at);
        assert_eq!(job.error.as_deref(), Some("page crashed"));
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!JobStatus::Submitted.is_terminal());
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Canceled.is_terminal());
        assert!(JobStatus::Timeout.is_terminal());
    }
}
