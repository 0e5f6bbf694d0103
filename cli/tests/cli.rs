use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn scanrelay(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("scanrelay").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("SCANRELAY_BASE_URL")
        .env_remove("SCANRELAY_API_KEY")
        .env_remove("SCANRELAY_STORE_DIR");
    cmd
}

#[test]
fn test_help_lists_commands() {
    let dir = TempDir::new().unwrap();
    scanrelay(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("scan"))
        .stdout(predicate::str::contains("cancel"));
}

#[test]
fn test_scan_rejects_invalid_url_without_network() {
    let dir = TempDir::new().unwrap();
    scanrelay(&dir)
        .args(["scan", "not-a-url"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not-a-url"));
}

#[test]
fn test_unknown_tier_is_rejected() {
    let dir = TempDir::new().unwrap();
    scanrelay(&dir)
        .args(["submit", "https://example.com", "--tier", "platinum"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("platinum"));
}

#[test]
fn test_status_of_unknown_job_fails() {
    let dir = TempDir::new().unwrap();
    scanrelay(&dir)
        .args(["status", "job-that-was-never-submitted"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("job-that-was-never-submitted"));
}

#[test]
fn test_invalid_config_is_reported() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("scanrelay.yaml"),
        "polling:\n  budget_secs: 0\n",
    )
    .unwrap();

    scanrelay(&dir)
        .args(["status", "job-1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("budget_secs"));
}
