//! Challenge Control - CLI host for the daily challenge engine.
//!
//! Thin shell over `challenge_common`: picks the date, loads config, prints.

mod commands;

use anyhow::{Context, Result};
use challenge_common::seed::parse_date;
use challenge_common::ChallengeConfig;
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Log filter environment variable
const LOG_ENV: &str = "CHALLENGE_LOG";

#[derive(Parser)]
#[command(name = "challengectl")]
#[command(about = "Daily challenge progression", long_about = None)]
#[command(version)]
struct Cli {
    /// Act as if today were this date (YYYY-MM-DD)
    #[arg(long, global = true)]
    date: Option<String>,

    /// Override the progress directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show today's challenge
    Today,

    /// Show this week's challenges and completion marks
    Week,

    /// Mark today's challenge as done
    Complete,

    /// Show points, streak, level and rewards
    Status,

    /// Clear all progress
    Reset {
        /// Skip the confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_date(arg: Option<&str>) -> Result<NaiveDate> {
    match arg {
        Some(raw) => parse_date(raw).context("Invalid --date"),
        None => Ok(Local::now().date_naive()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let mut config = ChallengeConfig::load().context("Failed to load challenge config")?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    let date = resolve_date(cli.date.as_deref())?;
    debug!("Using {} as today, data in {}", date, config.data_dir.display());
    let ctx = commands::Context::new(config, date, cli.json);

    match cli.command {
        Commands::Today => commands::today(&ctx).await,
        Commands::Week => commands::week(&ctx).await,
        Commands::Complete => commands::complete(&ctx).await,
        Commands::Status => commands::status(&ctx).await,
        Commands::Reset { force } => commands::reset(&ctx, force).await,
    }
}
