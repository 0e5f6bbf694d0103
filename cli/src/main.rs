mod commands;
mod scan;
mod display;

use anyhow::Result;
use clap::Parser;
use scanrelay_core::Config;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "scanrelay")]
#[command(about = "Accessibility scan relay", long_about = None)]
struct Cli {
    #[arg(short, long, global = true, help = "Path to a scanrelay.yaml config file")]
    config: Option<PathBuf>,

    #[arg(short, long, global = true, action = clap::ArgAction::Count, help = "Increase log verbosity")]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Parser)]
enum Commands {
    #[command(about = "Submit a scan and wait for the result")]
    Scan(commands::Scan),

    #[command(about = "Submit a scan and return its job id")]
    Submit(commands::Submit),

    #[command(about = "Poll a submitted scan once")]
    Status(commands::Status),

    #[command(about = "Cancel a submitted scan")]
    Cancel(commands::Cancel),
}

fn init_tracing(verbose: u8) {
    let default_filter = match verbose {
        0 => "scanrelay_core=info,scanrelay_cli=info",
        1 => "scanrelay_core=debug,scanrelay_cli=debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::load(cli.config.as_deref())?;
    tracing::debug!(base_url = %config.scanner.base_url, store = ?config.store.kind, "configuration loaded");

    match cli.command {
        Commands::Scan(cmd) => cmd.run(&config).await?,
        Commands::Submit(cmd) => cmd.run(&config).await?,
        Commands::Status(cmd) => cmd.run(&config).await?,
        Commands::Cancel(cmd) => cmd.run(&config).await?,
    }

    Ok(())
}
