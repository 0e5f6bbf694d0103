//! Maps scanner progress onto the dashboard's progress scale.

use crate::client::RemoteStatus;

/// Local progress assigned right after a successful submission.
pub const SUBMITTED_PROGRESS: u8 = 10;

/// Linear mapping from remote progress (0–100) onto a local sub-range.
///
/// The top of the local range is left for reconciliation, which sets 100.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressScale {
    pub floor: u8,
    pub span: f64,
    pub remote_cap: f64,
}

impl Default for ProgressScale {
    fn default() -> Self {
        Self {
            floor: 20,
            span: 0.7,
            remote_cap: 90.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub progress: u8,
    pub message: String,
}

impl ProgressScale {
    pub fn local(&self, remote_progress: f64) -> u8 {
        let remote = if remote_progress.is_finite() {
            remote_progress.clamp(0.0, 100.0).min(self.remote_cap)
        } else {
            0.0
        };
        // epsilon keeps products like 90 * 0.7 from flooring one point low
        let local = (f64::from(self.floor) + remote * self.span + 1e-9).floor();
        local.clamp(0.0, 100.0) as u8
    }

    /// Computes the next progress value and message for a polling tick.
    ///
    /// `previous` is the last persisted value; the result never goes below it.
    pub fn translate(
        &self,
        previous: u8,
        status: &RemoteStatus,
        remote_progress: f64,
    ) -> ProgressUpdate {
        ProgressUpdate {
            progress: previous.max(self.local(remote_progress)),
            message: status_message(status, remote_progress),
        }
    }
}

pub fn status_message(status: &RemoteStatus, remote_progress: f64) -> String {
    match status {
        RemoteStatus::Queued => "Waiting for an available scan worker".to_string(),
        RemoteStatus::Running => match remote_progress {
            p if p < 30.0 => "Loading page and analyzing structure",
            p if p < 60.0 => "Running WCAG compliance checks",
            p if p < 90.0 => "Processing accessibility violations",
            _ => "Finalizing scan results",
        }
        .to_string(),
        other => other.as_str().to_string(),
    }
}
