//! Drives a submitted job to a terminal state.
//!
//! ```text
//! Submitted ──submit ok──► Polling (queued/running) ──completed──► Completed
//!                             │   ▲                   └─malformed──► Failed
//!                             │   └── tick / transient error
//!                             ├── failed | canceled | timeout ─────► Failed | Canceled | Timeout
//!                             ├── 404 ─────────────────────────────► Failed (NotFound)
//!                             └── budget spent ── cancel ──────────► Failed (BudgetExhausted)
//! ```

use crate::backoff::BackoffPolicy;
use crate::client::{RemoteStatus, StatusReport};
use crate::error::{Result, ScanError};
use crate::progress::ProgressScale;
use crate::reconcile;
use crate::service::ScanService;
use crate::store::JobStore;
use crate::types::{FailureKind, JobPatch, JobStatus, ScanJob};
use chrono::Utc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    Transient,
    Fatal,
}

/// One status fetch. Only lives for the duration of a tick.
#[derive(Debug, Clone, Copy)]
pub struct PollAttempt {
    pub issued_at: Instant,
    pub interval: Duration,
    pub outcome: AttemptOutcome,
}

impl PollAttempt {
    fn record(self, job_id: &str) {
        debug!(
            job_id,
            outcome = ?self.outcome,
            took_ms = self.issued_at.elapsed().as_millis() as u64,
            interval_ms = self.interval.as_millis() as u64,
            "status poll"
        );
    }
}

enum Step {
    Continue(ScanJob),
    Done(ScanJob),
}

impl Step {
    fn into_job(self) -> ScanJob {
        match self {
            Step::Continue(job) | Step::Done(job) => job,
        }
    }
}

/// Polls one job on behalf of its single writer.
pub struct Poller<'a, S: ?Sized, J: ?Sized> {
    service: &'a S,
    store: &'a J,
    policy: BackoffPolicy,
    scale: ProgressScale,
}

impl<'a, S, J> Poller<'a, S, J>
where
    S: ScanService + ?Sized,
    J: JobStore + ?Sized,
{
    pub fn new(service: &'a S, store: &'a J, policy: BackoffPolicy) -> Self {
        Self {
            service,
            store,
            policy,
            scale: ProgressScale::default(),
        }
    }

    pub fn with_scale(mut self, scale: ProgressScale) -> Self {
        self.scale = scale;
        self
    }

    /// Polls with backoff until the job is terminal.
    ///
    /// A failed job is a normal return value; `Err` means the store failed.
    pub async fn drive(&self, mut job: ScanJob) -> Result<ScanJob> {
        let started = Instant::now();
        let mut schedule = self.policy.schedule();

        loop {
            let interval = schedule.peek();
            let remaining = self.policy.budget.saturating_sub(started.elapsed());

            job = match self.step(job, remaining, interval).await? {
                Step::Done(job) => return Ok(job),
                Step::Continue(job) => job,
            };

            let remaining = self.policy.budget.saturating_sub(started.elapsed());
            tokio::time::sleep(interval.min(remaining)).await;
            schedule.next();
        }
    }

    /// Runs a single poll without sleeping.
    ///
    /// The budget is measured from `submitted_at`. Terminal jobs are returned
    /// untouched, without contacting the scanner or writing to the store.
    pub async fn tick(&self, job: ScanJob) -> Result<ScanJob> {
        if job.is_terminal() {
            return Ok(job);
        }

        let elapsed = (Utc::now() - job.submitted_at)
            .to_std()
            .unwrap_or_default();
        let remaining = self.policy.budget.saturating_sub(elapsed);

        Ok(self.step(job, remaining, Duration::ZERO).await?.into_job())
    }

    async fn step(&self, job: ScanJob, remaining: Duration, interval: Duration) -> Result<Step> {
        if remaining.is_zero() {
            return self.exhaust(job, None).await.map(Step::Done);
        }

        let issued_at = Instant::now();
        let fetched =
            match tokio::time::timeout(remaining, self.service.fetch_status(&job.job_id)).await {
                Ok(result) => result,
                Err(_) => Err(ScanError::Timeout {
                    operation: "status fetch",
                    after: remaining,
                }),
            };

        let outcome = match &fetched {
            Ok(_) => AttemptOutcome::Success,
            Err(e) if e.is_transient() => AttemptOutcome::Transient,
            Err(_) => AttemptOutcome::Fatal,
        };
        PollAttempt {
            issued_at,
            interval,
            outcome,
        }
        .record(&job.job_id);

        match fetched {
            Ok(report) => self.apply_report(job, report).await,
            Err(e) if e.is_transient() => {
                let remaining = remaining.saturating_sub(issued_at.elapsed());
                if remaining <= self.policy.final_window {
                    return self.exhaust(job, Some(e)).await.map(Step::Done);
                }
                warn!(job_id = %job.job_id, error = %e, "transient status error, will retry");
                Ok(Step::Continue(job))
            }
            Err(e) => {
                let failure = match e {
                    ScanError::NotFound { .. } => FailureKind::NotFound,
                    ScanError::Decode { .. } => FailureKind::MalformedResult,
                    _ => FailureKind::Transport,
                };
                let patch = JobPatch::failed(JobStatus::Failed, failure, e.to_string());
                self.finish(job, patch).await.map(Step::Done)
            }
        }
    }

    async fn apply_report(&self, job: ScanJob, report: StatusReport) -> Result<Step> {
        let terminal_status = match &report.status {
            RemoteStatus::Queued | RemoteStatus::Running | RemoteStatus::Other(_) => {
                let update = self
                    .scale
                    .translate(job.progress, &report.status, report.progress());
                let status = match report.status {
                    RemoteStatus::Queued => JobStatus::Queued,
                    _ => JobStatus::Running,
                };

                let job = self
                    .store
                    .patch(
                        &job.job_id,
                        JobPatch::progress(status, update.progress, update.message),
                    )
                    .await?;

                // another writer (an explicit cancel) may have finished the job
                return Ok(if job.is_terminal() {
                    Step::Done(job)
                } else {
                    Step::Continue(job)
                });
            }
            RemoteStatus::Completed => {
                let patch = match reconcile::reconcile(&job.url, report.result.as_ref()) {
                    Ok(scan_report) => JobPatch::completed(scan_report),
                    Err(e) => {
                        warn!(job_id = %job.job_id, error = %e, "scanner returned an unusable result");
                        JobPatch::failed(JobStatus::Failed, FailureKind::MalformedResult, e.to_string())
                    }
                };
                return self.finish(job, patch).await.map(Step::Done);
            }
            RemoteStatus::Failed => JobStatus::Failed,
            RemoteStatus::Canceled => JobStatus::Canceled,
            RemoteStatus::Timeout => JobStatus::Timeout,
        };

        let error = report
            .error
            .or(report.message)
            .unwrap_or_else(|| format!("scanner reported {}", report.status));
        let patch = JobPatch::failed(terminal_status, FailureKind::Remote, error);
        self.finish(job, patch).await.map(Step::Done)
    }

    /// Best-effort remote cancel, then a local `Failed`.
    ///
    /// A job that went terminal in the store meanwhile (a caller cancel) is
    /// returned as stored, without a second remote cancel.
    async fn exhaust(&self, job: ScanJob, cause: Option<ScanError>) -> Result<ScanJob> {
        if let Some(current) = self.store.get(&job.job_id).await? {
            if current.is_terminal() {
                debug!(job_id = %job.job_id, status = %current.status, "job already terminal, skipping cancel");
                return Ok(current);
            }
        }

        match self.service.cancel(&job.job_id).await {
            Ok(_) => info!(job_id = %job.job_id, "canceled remote job after budget exhaustion"),
            Err(ScanError::NotFound { .. }) => {
                debug!(job_id = %job.job_id, "remote job already gone")
            }
            Err(e) => warn!(job_id = %job.job_id, error = %e, "best-effort cancel failed"),
        }

        let exhausted = ScanError::BudgetExhausted {
            budget: self.policy.budget,
        };
        let message = match cause {
            Some(cause) => format!("{}: {}", exhausted, cause),
            None => exhausted.to_string(),
        };

        let patch = JobPatch::failed(JobStatus::Failed, FailureKind::BudgetExhausted, message);
        self.finish(job, patch).await
    }

    async fn finish(&self, job: ScanJob, patch: JobPatch) -> Result<ScanJob> {
        let job = self.store.patch(&job.job_id, patch).await?;
        info!(
            job_id = %job.job_id,
            status = %job.status,
            failure = ?job.failure,
            progress = job.progress,
            "scan job finished"
        );
        Ok(job)
    }
}
