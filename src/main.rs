use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use repoherald::scan::{self, RunOptions, RunSummary};
use repoherald::{watch, Config};

#[derive(Parser)]
#[command(name = "repoherald")]
#[command(about = "Announces newly created GitHub repositories on Bluesky")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Check only the first N roster organizations
    #[arg(short, long, global = true)]
    limit: Option<usize>,

    /// Announcement window in minutes (overrides CHECK_MINUTES)
    #[arg(short, long, global = true)]
    minutes: Option<u32>,

    /// Check a single account by handle or GitHub URL, bypassing the roster
    #[arg(short, long, global = true)]
    org: Option<String>,

    /// Display name for --org when it is not in the roster
    #[arg(short, long, global = true)]
    name: Option<String>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the check on an interval in the foreground until interrupted
    Watch {
        /// Minutes between runs (defaults to the announcement window)
        #[arg(long)]
        every: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose)?;
    info!("Starting repoherald v{}", env!("CARGO_PKG_VERSION"));

    // A local .env file fills in anything the real environment leaves unset.
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    let opts = RunOptions {
        limit: cli.limit,
        org: cli.org,
        name: cli.name,
        minutes: cli.minutes,
    };

    match cli.command {
        Some(Commands::Watch { every }) => watch::run_watch(&config, &opts, every).await,
        None => cmd_run(&config, &opts).await,
    }
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    Ok(())
}

/// Execute a single one-shot run and print its summary.
///
/// Per-organization failures are part of a completed run and do not affect
/// the exit code; only run-poisoning failures (bad configuration, missing
/// roster, rejected login) exit non-zero.
async fn cmd_run(config: &Config, opts: &RunOptions) -> Result<()> {
    let summary = scan::execute_run(config, opts).await?;
    print_summary(&summary);
    Ok(())
}

/// Print the run summary to stdout
fn print_summary(summary: &RunSummary) {
    println!();
    println!("📊 Run Summary");
    println!("   Organizations checked: {}", summary.orgs_checked);
    println!("   New repositories found: {}", summary.total_found);
    println!("   Announcements delivered: {}", summary.total_announced);

    for result in &summary.results {
        if result.repos_found > 0 {
            println!(
                "   📦 {}: {} found, {} announced",
                result.display_name, result.repos_found, result.repos_announced
            );
        }
    }

    if summary.orgs_failed > 0 {
        println!("   ❌ Organizations with errors: {}", summary.orgs_failed);
        for result in summary.failed_orgs() {
            if let Some(error) = &result.error {
                println!("      {}: {}", result.handle, error);
            }
        }
    }
}
