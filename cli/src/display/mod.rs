use colored::Colorize;
use scanrelay_core::{JobStatus, ScanJob, ScanReport, Severity};

pub fn print_job(job: &ScanJob) {
    println!("\n{}", "=".repeat(60));
    println!("Scanrelay Job {}", job.job_id);
    println!("{}", "=".repeat(60));
    println!("URL: {}", job.url);
    println!("Type: {}  Tier: {}", job.scan_type, job.tier);
    println!("Status: {}", status_label(job.status));
    println!("Progress: {}%", job.progress);
    if let Some(message) = &job.message {
        println!("Message: {}", message);
    }
    if let Some(eta) = &job.estimated_completion {
        if !job.is_terminal() {
            println!("Estimated completion: {}", eta);
        }
    }
    if let Some(completed_at) = job.completed_at {
        let took = completed_at - job.submitted_at;
        println!("Finished: {} ({}s)", completed_at.to_rfc3339(), took.num_seconds());
    }
    if let Some(error) = &job.error {
        println!("Error: {}", error.red());
    }
    println!();

    if let Some(report) = &job.report {
        print_report(report);
    }
}

fn print_report(report: &ScanReport) {
    println!("Accessibility score: {}", score_label(report.accessibility_score));
    println!("Summary:");
    println!("  Violations: {}", report.summary.total);
    if report.summary.critical > 0 {
        println!("    Critical: {}", report.summary.critical);
    }
    if report.summary.serious > 0 {
        println!("    Serious: {}", report.summary.serious);
    }
    if report.summary.moderate > 0 {
        println!("    Moderate: {}", report.summary.moderate);
    }
    if report.summary.minor > 0 {
        println!("    Minor: {}", report.summary.minor);
    }
    if report.summary.cross_validated > 0 {
        println!("  Confirmed by multiple engines: {}", report.summary.cross_validated);
    }
    println!();

    if !report.issues.is_empty() {
        println!("Issues:");
        for severity in [Severity::Critical, Severity::Serious, Severity::Moderate, Severity::Minor] {
            for issue in report.issues_by_severity(severity) {
                println!("  - [{}] {} {}", severity_label(severity), issue.code, issue.message);
                if let Some(selector) = &issue.selector {
                    println!("    Selector: {}", selector);
                }
                if issue.cross_validated {
                    println!("    Cross-validated");
                }
            }
        }
        println!();
    }

    if !report.warnings.is_empty() {
        println!("Warnings:");
        for warning in &report.warnings {
            println!("  - {}", warning);
        }
        println!();
    }

    if report.has_critical_issues() {
        println!("{}", "Critical accessibility issues found!".red().bold());
    }
}

fn status_label(status: JobStatus) -> colored::ColoredString {
    let label = status.to_string();
    match status {
        JobStatus::Completed => label.green(),
        JobStatus::Failed | JobStatus::Timeout => label.red(),
        JobStatus::Canceled => label.yellow(),
        JobStatus::Submitted | JobStatus::Queued | JobStatus::Running => label.cyan(),
    }
}

fn severity_label(severity: Severity) -> colored::ColoredString {
    let label = severity.to_string();
    match severity {
        Severity::Critical => label.red().bold(),
        Severity::Serious => label.red(),
        Severity::Moderate => label.yellow(),
        Severity::Minor => label.normal(),
    }
}

fn score_label(score: u8) -> colored::ColoredString {
    let label = format!("{}/100", score);
    match score {
        90..=100 => label.green(),
        60..=89 => label.yellow(),
        _ => label.red(),
    }
}

pub fn print_json(job: &ScanJob) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(job)?)
}
