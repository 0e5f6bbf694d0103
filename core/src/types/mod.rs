pub mod issue;
pub mod job;
pub mod scan;

pub use issue::{NormalizedIssue, Severity};
pub use job::{FailureKind, JobPatch, JobStatus, ScanJob};
pub use scan::{ScanOptions, ScanRequest, ScanType, Tier};
