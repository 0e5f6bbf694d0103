use crate::backoff::BackoffPolicy;
use crate::client::RemoteStatus;
use crate::error::{Result, ScanError};
use crate::poller::Poller;
use crate::progress::{ProgressScale, SUBMITTED_PROGRESS};
use crate::service::ScanService;
use crate::store::JobStore;
use crate::types::{FailureKind, JobPatch, JobStatus, ScanJob, ScanRequest};
use tracing::{debug, info, warn};

/// Caller-facing entry points over a scanner and a job store.
pub struct Scanner<S, J> {
    service: S,
    store: J,
    policy: BackoffPolicy,
    scale: ProgressScale,
}

impl<S, J> Scanner<S, J>
where
    S: ScanService,
    J: JobStore,
{
    pub fn new(service: S, store: J) -> Self {
        Self {
            service,
            store,
            policy: BackoffPolicy::default(),
            scale: ProgressScale::default(),
        }
    }

    pub fn with_policy(mut self, policy: BackoffPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_scale(mut self, scale: ProgressScale) -> Self {
        self.scale = scale;
        self
    }

    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    pub fn store(&self) -> &J {
        &self.store
    }

    fn poller(&self) -> Poller<'_, S, J> {
        Poller::new(&self.service, &self.store, self.policy).with_scale(self.scale)
    }

    /// Submits a scan and polls it until it is terminal.
    ///
    /// Submission errors are returned as `Err` because no job exists yet.
    /// Once a job id is issued, failures end up in the returned job.
    pub async fn run_scan(&self, request: &ScanRequest) -> Result<ScanJob> {
        let job = self.submit_scan(request).await?;
        self.poller().drive(job).await
    }

    /// Submits a scan and records it, leaving polling to the caller.
    pub async fn submit_scan(&self, request: &ScanRequest) -> Result<ScanJob> {
        let submission = self.service.submit(request).await?;

        let mut job = ScanJob::new(submission.job_id, request);
        job.estimated_completion = submission.estimated_completion;
        if let Some(tier) = submission.tier {
            if tier != request.tier {
                warn!(job_id = %job.job_id, requested = %request.tier, echoed = %tier, "scanner echoed a different tier");
            }
        }

        let (status, message) = match submission.status {
            Some(RemoteStatus::Queued) | None => (JobStatus::Queued, "Scan queued".to_string()),
            Some(RemoteStatus::Running) => (JobStatus::Running, "Scan started".to_string()),
            Some(other) => (JobStatus::Submitted, other.as_str().to_string()),
        };
        job.status = status;
        job.progress = SUBMITTED_PROGRESS;
        job.message = Some(message);

        self.store.insert(job.clone()).await?;
        info!(job_id = %job.job_id, status = %job.status, "scan job recorded");

        Ok(job)
    }

    /// One poll of a recorded job. Terminal jobs come back unchanged.
    pub async fn poll_status(&self, job_id: &str) -> Result<ScanJob> {
        let job = self.load(job_id).await?;
        self.poller().tick(job).await
    }

    /// Cancels a job on behalf of the caller.
    ///
    /// The local record becomes `Canceled` whatever the scanner answers.
    pub async fn cancel_scan(&self, job_id: &str) -> Result<ScanJob> {
        let job = self.load(job_id).await?;
        if job.is_terminal() {
            return Ok(job);
        }

        match self.service.cancel(job_id).await {
            Ok(ack) => debug!(job_id, ack = ?ack.status, "scanner acknowledged cancel"),
            Err(ScanError::NotFound { .. }) => debug!(job_id, "job already finished on the scanner"),
            Err(e) => warn!(job_id, error = %e, "remote cancel failed, canceling locally"),
        }

        let job = self
            .store
            .patch(
                job_id,
                JobPatch::failed(JobStatus::Canceled, FailureKind::Canceled, "Scan canceled by user"),
            )
            .await?;
        info!(job_id, "scan job canceled");

        Ok(job)
    }

    async fn load(&self, job_id: &str) -> Result<ScanJob> {
        self.store
            .get(job_id)
            .await?
            .ok_or_else(|| ScanError::UnknownJob {
                job_id: job_id.to_string(),
            })
    }
}
