use crate::client::{CancelAck, StatusReport, Submission};
use crate::error::Result;
use crate::types::ScanRequest;
use async_trait::async_trait;

/// The remote scanner as seen by the poll loop.
///
/// Every call is a single bounded exchange. Implementations must not retry:
/// retry and backoff belong to [`crate::poller::Poller`].
#[async_trait]
pub trait ScanService: Send + Sync {
    async fn health(&self) -> Result<()>;

    async fn submit(&self, request: &ScanRequest) -> Result<Submission>;

    async fn fetch_status(&self, job_id: &str) -> Result<StatusReport>;

    async fn cancel(&self, job_id: &str) -> Result<CancelAck>;
}
