use crate::error::{Result, ScanError};
use crate::types::{JobPatch, ScanJob};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// Record store holding scan jobs.
///
/// `patch` must route through [`ScanJob::apply`], so terminal jobs stay
/// frozen and progress never regresses whichever store is used.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn get(&self, job_id: &str) -> Result<Option<ScanJob>>;

    async fn insert(&self, job: ScanJob) -> Result<()>;

    async fn patch(&self, job_id: &str, patch: JobPatch) -> Result<ScanJob>;
}

#[async_trait]
impl<T: JobStore + ?Sized> JobStore for Box<T> {
    async fn get(&self, job_id: &str) -> Result<Option<ScanJob>> {
        (**self).get(job_id).await
    }

    async fn insert(&self, job: ScanJob) -> Result<()> {
        (**self).insert(job).await
    }

    async fn patch(&self, job_id: &str, patch: JobPatch) -> Result<ScanJob> {
        (**self).patch(job_id, patch).await
    }
}

#[derive(Debug, Default)]
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<String, ScanJob>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn get(&self, job_id: &str) -> Result<Option<ScanJob>> {
        Ok(self.jobs.read().await.get(job_id).cloned())
    }

    async fn insert(&self, job: ScanJob) -> Result<()> {
        self.jobs.write().await.insert(job.job_id.clone(), job);
        Ok(())
    }

    async fn patch(&self, job_id: &str, patch: JobPatch) -> Result<ScanJob> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(job_id).ok_or_else(|| ScanError::UnknownJob {
            job_id: job_id.to_string(),
        })?;
        job.apply(patch);
        Ok(job.clone())
    }
}

/// One pretty-printed JSON file per job under `base_path`.
///
/// Writes are serialized through a lock so a patch is a read-modify-write
/// that cannot interleave with another patch in this process.
#[derive(Debug)]
pub struct FileJobStore {
    base_path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl FileJobStore {
    pub fn new(base_path: PathBuf) -> Self {
        Self {
            base_path,
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path_for(&self, job_id: &str) -> PathBuf {
        self.base_path
            .join(format!("{}.json", encode_job_key(job_id)))
    }

    async fn read(&self, job_id: &str) -> Result<Option<ScanJob>> {
        let path = self.path_for(job_id);
        let job = match self.read_path(&path).await? {
            Some(job) => job,
            None => return Ok(None),
        };

        if job.job_id != job_id {
            return Err(ScanError::Store {
                message: format!(
                    "record {} holds job '{}', expected '{}'",
                    path.display(),
                    job.job_id,
                    job_id
                ),
            });
        }
        Ok(Some(job))
    }

    async fn read_path(&self, path: &Path) -> Result<Option<ScanJob>> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| ScanError::Store {
                message: format!("corrupt job record {}: {}", path.display(), e),
            })
    }

    async fn write(&self, job: &ScanJob) -> Result<()> {
        let path = self.path_for(&job.job_id);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(job).map_err(|e| ScanError::Store {
            message: format!("failed to serialize job {}: {}", job.job_id, e),
        })?;

        // write then rename so readers never see a half-written record
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

#[async_trait]
impl JobStore for FileJobStore {
    async fn get(&self, job_id: &str) -> Result<Option<ScanJob>> {
        self.read(job_id).await
    }

    async fn insert(&self, job: ScanJob) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.write(&job).await
    }

    async fn patch(&self, job_id: &str, patch: JobPatch) -> Result<ScanJob> {
        let _guard = self.write_lock.lock().await;

        let mut job = self
            .read(job_id)
            .await?
            .ok_or_else(|| ScanError::UnknownJob {
                job_id: job_id.to_string(),
            })?;

        if job.apply(patch) {
            self.write(&job).await?;
        }
        Ok(job)
    }
}

/// Percent-encodes a job id into a file stem. Distinct ids never share a
/// stem and the result never contains a path separator.
pub fn encode_job_key(key: &str) -> String {
    url::form_urlencoded::byte_serialize(key.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FailureKind, JobStatus, ScanRequest};
    use tempfile::TempDir;

    fn job(id: &str) -> ScanJob {
        ScanJob::new(id, &ScanRequest::new("https://example.com"))
    }

    #[tokio::test]
    async fn test_memory_store_patch() {
        let store = MemoryJobStore::new();
        store.insert(job("job-1")).await.unwrap();

        let updated = store
            .patch("job-1", JobPatch::progress(JobStatus::Running, 42, "checking"))
            .await
            .unwrap();

        assert_eq!(updated.progress, 42);
        assert_eq!(store.get("job-1").await.unwrap().unwrap().progress, 42);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_memory_store_unknown_job() {
        let store = MemoryJobStore::new();
        let result = store.patch("missing", JobPatch::default()).await;
        assert!(matches!(result, Err(ScanError::UnknownJob { .. })));
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_store_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileJobStore::new(temp_dir.path().to_path_buf());

        store.insert(job("job-7")).await.unwrap();
        store
            .patch("job-7", JobPatch::progress(JobStatus::Queued, 20, "waiting"))
            .await
            .unwrap();

        let reopened = FileJobStore::new(temp_dir.path().to_path_buf());
        let stored = reopened.get("job-7").await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Queued);
        assert_eq!(stored.progress, 20);
        assert_eq!(stored.message.as_deref(), Some("waiting"));
    }

    #[tokio::test]
    async fn test_file_store_keeps_terminal_jobs_frozen() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileJobStore::new(temp_dir.path().to_path_buf());

        store.insert(job("job-8")).await.unwrap();
        store
            .patch(
                "job-8",
                JobPatch::failed(JobStatus::Timeout, FailureKind::Remote, "scanner gave up"),
            )
            .await
            .unwrap();

        let after = store
            .patch("job-8", JobPatch::progress(JobStatus::Running, 70, "late"))
            .await
            .unwrap();

        assert_eq!(after.status, JobStatus::Timeout);
        assert_eq!(after.progress, 0);
    }

    #[tokio::test]
    async fn test_file_store_missing_and_unsafe_ids() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileJobStore::new(temp_dir.path().to_path_buf());

        assert!(store.get("nope").await.unwrap().is_none());
        assert_eq!(
            store.path_for("../etc/passwd"),
            temp_dir.path().join("..%2Fetc%2Fpasswd.json")
        );
    }

    #[tokio::test]
    async fn test_file_store_keeps_similar_ids_apart() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileJobStore::new(temp_dir.path().to_path_buf());

        store
            .insert(ScanJob::new("a/b", &ScanRequest::new("https://one.example")))
            .await
            .unwrap();
        store
            .insert(ScanJob::new("a_b", &ScanRequest::new("https://two.example")))
            .await
            .unwrap();

        assert_ne!(store.path_for("a/b"), store.path_for("a_b"));
        assert_ne!(store.path_for("a+b"), store.path_for("a b"));

        let first = store.get("a/b").await.unwrap().unwrap();
        assert_eq!(first.job_id, "a/b");
        assert_eq!(first.url, "https://one.example");

        let updated = store
            .patch("a/b", JobPatch::progress(JobStatus::Running, 30, "checking"))
            .await
            .unwrap();
        assert_eq!(updated.url, "https://one.example");
        assert_eq!(store.get("a_b").await.unwrap().unwrap().progress, 0);
    }

    #[tokio::test]
    async fn test_file_store_rejects_foreign_record() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileJobStore::new(temp_dir.path().to_path_buf());

        store.insert(job("job-9")).await.unwrap();
        tokio::fs::rename(store.path_for("job-9"), store.path_for("job-10"))
            .await
            .unwrap();

        let result = store.get("job-10").await;
        assert!(matches!(result, Err(ScanError::Store { .. })));
        let result = store
            .patch("job-10", JobPatch::progress(JobStatus::Running, 30, "late"))
            .await;
        assert!(matches!(result, Err(ScanError::Store { .. })));
    }
}
