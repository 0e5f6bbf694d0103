use crate::{NormalizedIssue, Severity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub url: String,

    pub scanned_at: DateTime<Utc>,

    pub accessibility_score: u8,

    pub summary: IssueSummary,

    pub issues: Vec<NormalizedIssue>,

    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct IssueSummary {
    /// Violation count as reported by the scanner.
    pub total: usize,
    pub critical: usize,
    pub serious: usize,
    pub moderate: usize,
    pub minor: usize,
    pub cross_validated: usize,
}

impl ScanReport {
    pub fn new(url: String, reported_total: usize) -> Self {
        Self {
            url,
            scanned_at: Utc::now(),
            accessibility_score: 100,
            summary: IssueSummary {
                total: reported_total,
                ..IssueSummary::default()
            },
            issues: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn add_issue(&mut self, issue: NormalizedIssue) {
        match issue.severity {
            Severity::Critical => self.summary.critical += 1,
            Severity::Serious => self.summary.serious += 1,
            Severity::Moderate => self.summary.moderate += 1,
            Severity::Minor => self.summary.minor += 1,
        }
        if issue.cross_validated {
            self.summary.cross_validated += 1;
        }

        self.issues.push(issue);
    }

    pub fn has_critical_issues(&self) -> bool {
        self.summary.critical > 0
    }

    pub fn issues_by_severity(&self, severity: Severity) -> impl Iterator<Item = &NormalizedIssue> {
        self.issues.iter().filter(move |i| i.severity == severity)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
