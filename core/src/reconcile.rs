//! Turns a completed scanner payload into a [`ScanReport`].

use crate::client::{RawResult, RawViolation};
use crate::error::{Result, ScanError};
use crate::report::ScanReport;
use crate::types::{NormalizedIssue, Severity};
use std::collections::HashSet;

const CRITICAL_PENALTY: u64 = 10;
const OTHER_PENALTY: u64 = 2;

/// `max(0, 100 - critical*10 - (total-critical)*2)`, saturating for any count.
pub fn accessibility_score(total: usize, critical: usize) -> u8 {
    let total = total as u64;
    let critical = (critical as u64).min(total);
    let penalty = critical
        .saturating_mul(CRITICAL_PENALTY)
        .saturating_add((total - critical).saturating_mul(OTHER_PENALTY));
    100u64.saturating_sub(penalty) as u8
}

/// Builds the final report for a job that the scanner reported as completed.
///
/// `target_url` is the URL the job was submitted with; it stands in when the
/// payload does not echo one.
pub fn reconcile(target_url: &str, result: Option<&RawResult>) -> Result<ScanReport> {
    let result = result.ok_or_else(|| ScanError::MalformedResult {
        message: "completed job carried no result".to_string(),
    })?;

    let total = result
        .violation_count
        .ok_or_else(|| ScanError::MalformedResult {
            message: "result is missing violationCount".to_string(),
        })?;
    let total = usize::try_from(total).unwrap_or(usize::MAX);

    let url = result
        .url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .unwrap_or(target_url.trim());
    if url.is_empty() {
        return Err(ScanError::MalformedResult {
            message: "result is missing url".to_string(),
        });
    }

    let mut report = ScanReport::new(url.to_string(), total);
    for violation in &result.violations {
        let issue = normalize(violation, &mut report.warnings);
        report.add_issue(issue);
    }

    if result.violations.len() > total {
        report.warnings.push(format!(
            "scanner listed {} violations but reported a count of {}",
            result.violations.len(),
            total
        ));
    }

    report.accessibility_score = accessibility_score(total, report.summary.critical);

    Ok(report)
}

pub fn normalize(violation: &RawViolation, warnings: &mut Vec<String>) -> NormalizedIssue {
    let code = first_present(&[&violation.code, &violation.id])
        .unwrap_or("unknown-rule")
        .to_string();

    let label = first_present(&[&violation.impact, &violation.kind]);
    let severity = match label.and_then(Severity::from_impact) {
        Some(severity) => severity,
        None => {
            let label = label.unwrap_or("<missing>");
            tracing::warn!(rule = %code, impact = label, "unknown violation impact, defaulting to moderate");
            warnings.push(format!(
                "rule {} had unknown impact '{}', recorded as moderate",
                code, label
            ));
            Severity::Moderate
        }
    };

    let engines: HashSet<&str> = violation
        .engines
        .iter()
        .map(|e| e.trim())
        .filter(|e| !e.is_empty())
        .collect();

    NormalizedIssue {
        code,
        severity,
        message: first_present(&[&violation.message, &violation.description])
            .unwrap_or_default()
            .to_string(),
        selector: first_present(&[&violation.selector]).map(str::to_string),
        context: first_present(&[&violation.context, &violation.html]).map(str::to_string),
        cross_validated: violation.cross_validated == Some(true) || engines.len() > 1,
    }
}

fn first_present<'a>(candidates: &[&'a Option<String>]) -> Option<&'a str> {
    candidates
        .iter()
        .filter_map(|c| (*c).as_deref())
        .map(str::trim)
        .find(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn violation(impact: &str) -> RawViolation {
        RawViolation {
            code: Some("color-contrast".to_string()),
            impact: Some(impact.to_string()),
            message: Some("Insufficient contrast".to_string()),
            selector: Some("#hero > p".to_string()),
            html: Some("<p class=\"muted\">".to_string()),
            ..RawViolation::default()
        }
    }

    #[test]
    fn test_huge_violation_count_scores_zero() {
        for count in [1u64 << 62, u64::MAX] {
            let result = RawResult {
                url: Some("https://example.com".to_string()),
                violation_count: Some(count),
                violations: vec![violation("critical")],
            };

            let report = reconcile("https://example.com", Some(&result)).unwrap();
            assert_eq!(report.accessibility_score, 0, "count {}", count);
        }

        assert_eq!(accessibility_score(usize::MAX, usize::MAX), 0);
        assert_eq!(accessibility_score(50, 0), 0);
        assert_eq!(accessibility_score(0, 0), 100);
    }

    #[test]
    fn test_score_with_one_critical_of_three() {
        let result = RawResult {
            url: Some("https://example.com".to_string()),
            violation_count: Some(3),
            violations: vec![violation("critical")],
        };

        let report = reconcile("https://example.com", Some(&result)).unwrap();

        assert_eq!(report.accessibility_score, 86);
        assert_eq!(report.summary.total, 3);
        assert_eq!(report.summary.critical, 1);
        assert_eq!(report.issues.len(), 1);
    }

    #[test]
    fn test_issues_grouped_by_severity() {
        let result = RawResult {
            url: Some("https://example.com".to_string()),
            violation_count: Some(3),
            violations: vec![violation("minor"), violation("critical"), violation("notice")],
        };

        let report = reconcile("https://example.com", Some(&result)).unwrap();

        assert_eq!(report.issues_by_severity(Severity::Critical).count(), 1);
        assert_eq!(report.issues_by_severity(Severity::Minor).count(), 2);
        assert_eq!(report.issues_by_severity(Severity::Serious).count(), 0);
    }

    #[test]
    fn test_score_floor_is_zero() {
        assert_eq!(accessibility_score(0, 0), 100);
        assert_eq!(accessibility_score(12, 11), 0);
        assert_eq!(accessibility_score(60, 0), 0);
        assert_eq!(accessibility_score(5, 9), 50);
    }

    #[test]
    fn test_severity_lookup() {
        let mut warnings = Vec::new();
        let cases = [
            ("critical", Severity::Critical),
            ("serious", Severity::Serious),
            ("error", Severity::Serious),
            ("Moderate", Severity::Moderate),
            ("warning", Severity::Moderate),
            ("minor", Severity::Minor),
            ("notice", Severity::Minor),
        ];

        for (label, expected) in cases {
            assert_eq!(normalize(&violation(label), &mut warnings).severity, expected);
        }
        assert!(warnings.is_empty());

        let issue = normalize(&violation("catastrophic"), &mut warnings);
        assert_eq!(issue.severity, Severity::Moderate);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_type_field_is_used_when_impact_missing() {
        let raw = RawViolation {
            code: Some("WCAG2AA.Principle1.Guideline1_1.1_1_1.H37".to_string()),
            kind: Some("error".to_string()),
            context: Some("<img src=\"logo.png\">".to_string()),
            ..RawViolation::default()
        };

        let issue = normalize(&raw, &mut Vec::new());
        assert_eq!(issue.severity, Severity::Serious);
        assert_eq!(issue.context.as_deref(), Some("<img src=\"logo.png\">"));
    }

    #[test]
    fn test_cross_validation_requires_explicit_marker() {
        let mut raw = violation("serious");
        assert!(!normalize(&raw, &mut Vec::new()).cross_validated);

        raw.engines = vec!["axe".to_string()];
        assert!(!normalize(&raw, &mut Vec::new()).cross_validated);

        raw.engines = vec!["axe".to_string(), "htmlcs".to_string()];
        assert!(normalize(&raw, &mut Vec::new()).cross_validated);

        raw.engines.clear();
        raw.cross_validated = Some(true);
        assert!(normalize(&raw, &mut Vec::new()).cross_validated);
    }

    #[test]
    fn test_malformed_results() {
        assert!(matches!(
            reconcile("https://example.com", None),
            Err(ScanError::MalformedResult { .. })
        ));

        let missing_count = RawResult {
            url: Some("https://example.com".to_string()),
            ..RawResult::default()
        };
        assert!(matches!(
            reconcile("https://example.com", Some(&missing_count)),
            Err(ScanError::MalformedResult { .. })
        ));

        let missing_url = RawResult {
            violation_count: Some(0),
            ..RawResult::default()
        };
        assert!(matches!(
            reconcile("", Some(&missing_url)),
            Err(ScanError::MalformedResult { .. })
        ));
    }

    #[test]
    fn test_target_url_fills_missing_result_url() {
        let result = RawResult {
            violation_count: Some(0),
            ..RawResult::default()
        };

        let report = reconcile("https://example.com", Some(&result)).unwrap();
        assert_eq!(report.url, "https://example.com");
        assert_eq!(report.accessibility_score, 100);
        assert!(report.issues.is_empty());
    }
}
