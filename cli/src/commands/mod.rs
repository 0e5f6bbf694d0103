use clap::{Args, Parser};
use scanrelay_core::{Config, JobStatus, ScanOptions, ScanRequest, ScanType, Tier};
use std::time::Duration;

#[derive(Args)]
pub struct Target {
    #[arg(help = "URL to scan")]
    url: String,
    #[arg(long = "type", default_value = "single_page", help = "single_page or multi_page")]
    scan_type: ScanType,
    #[arg(long, default_value = "starter", help = "Customer tier")]
    tier: Tier,
    #[arg(long, help = "Page limit for multi-page scans")]
    max_pages: Option<u32>,
    #[arg(long, help = "WCAG conformance level, e.g. AA")]
    wcag_level: Option<String>,
    #[arg(long, help = "Include warnings alongside violations")]
    include_warnings: bool,
}

impl Target {
    fn request(&self) -> ScanRequest {
        ScanRequest::new(self.url.clone())
            .with_scan_type(self.scan_type)
            .with_tier(self.tier)
            .with_options(ScanOptions {
                max_pages: self.max_pages,
                wcag_level: self.wcag_level.clone(),
                include_warnings: self.include_warnings,
            })
    }
}

#[derive(Parser)]
pub struct Scan {
    #[command(flatten)]
    target: Target,
    #[arg(long, help = "Give up after this many seconds")]
    budget_secs: Option<u64>,
    #[arg(long, help = "First polling interval in milliseconds")]
    interval_ms: Option<u64>,
    #[arg(short, long, help = "Output in JSON format")]
    json: bool,
}

impl Scan {
    pub async fn run(&self, config: &Config) -> anyhow::Result<()> {
        let scanner = super::scan::build_scanner(config)?;
        let mut policy = *scanner.policy();
        if let Some(budget) = self.budget_secs {
            if budget <= policy.final_window.as_secs() {
                anyhow::bail!(
                    "--budget-secs must be longer than the {}s final window",
                    policy.final_window.as_secs()
                );
            }
            policy = policy.with_budget(Duration::from_secs(budget));
        }
        if let Some(interval) = self.interval_ms {
            policy = policy.with_initial(Duration::from_millis(interval.max(1)));
        }

        let scanner = scanner.with_policy(policy);
        let job = scanner.run_scan(&self.target.request()).await?;

        if self.json {
            println!("{}", super::display::print_json(&job)?);
        } else {
            super::display::print_job(&job);
        }

        if job.status != JobStatus::Completed {
            anyhow::bail!("scan {} ended as {}", job.job_id, job.status);
        }

        Ok(())
    }
}

#[derive(Parser)]
pub struct Submit {
    #[command(flatten)]
    target: Target,
    #[arg(short, long, help = "Output in JSON format")]
    json: bool,
}

impl Submit {
    pub async fn run(&self, config: &Config) -> anyhow::Result<()> {
        let scanner = super::scan::build_scanner(config)?;
        let job = scanner.submit_scan(&self.target.request()).await?;

        if self.json {
            println!("{}", super::display::print_json(&job)?);
        } else {
            println!("{}", job.job_id);
        }

        Ok(())
    }
}

#[derive(Parser)]
pub struct Status {
    #[arg(help = "Job id returned by submit")]
    job_id: String,
    #[arg(short, long, help = "Output in JSON format")]
    json: bool,
}

impl Status {
    pub async fn run(&self, config: &Config) -> anyhow::Result<()> {
        let scanner = super::scan::build_scanner(config)?;
        let job = scanner.poll_status(&self.job_id).await?;

        if self.json {
            println!("{}", super::display::print_json(&job)?);
        } else {
            super::display::print_job(&job);
        }

        Ok(())
    }
}

#[derive(Parser)]
pub struct Cancel {
    #[arg(help = "Job id returned by submit")]
    job_id: String,
}

impl Cancel {
    pub async fn run(&self, config: &Config) -> anyhow::Result<()> {
        let scanner = super::scan::build_scanner(config)?;
        let job = scanner.cancel_scan(&self.job_id).await?;
        super::display::print_job(&job);
        Ok(())
    }
}
