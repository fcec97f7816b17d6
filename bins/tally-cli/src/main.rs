//! tally-cli: operator tooling for the Tally staking ledger.
//!
//! Inspects the configured rate schedule, quotes what a position would be
//! worth, and replays scripted operation logs against an in-memory ledger.
//! All output is JSON on stdout; logs go to stderr.

mod quote;
mod replay;
mod settings;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tally_core::types::{Amount, Days};
use tracing::info;

/// Tally staking ledger operator CLI.
#[derive(Parser, Debug)]
#[command(name = "tally-cli", version, about = "Inspect, quote and replay Tally ledgers")]
struct Cli {
    /// Configuration file (TOML or JSON). `TALLY__*` variables override it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Log output format ("text" or "json")
    #[arg(long, global = true, default_value = "text")]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the validated rate schedule.
    Schedule,
    /// Price a hypothetical position.
    Quote(QuoteArgs),
    /// Replay a JSON script of ledger operations.
    Replay(ReplayArgs),
}

#[derive(Args, Debug)]
struct QuoteArgs {
    /// Principal in base units.
    #[arg(long)]
    amount: Amount,

    /// Staking period in days; must be a tier or the rollover period.
    #[arg(long)]
    period: Days,

    /// Days since the position was opened.
    #[arg(long, default_value_t = 0)]
    elapsed_days: Days,
}

#[derive(Args, Debug)]
struct ReplayArgs {
    /// Path to the script.
    script: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, &cli.log_format);

    let config = settings::load(cli.config.as_deref())?;
    info!(admin = %config.admin, "configuration loaded");

    match cli.command {
        Commands::Schedule => print_json(&config.schedule()?),
        Commands::Quote(args) => {
            let quote = quote::quote(
                config.schedule()?,
                args.amount,
                args.period,
                args.elapsed_days,
            )?;
            print_json(&quote)
        }
        Commands::Replay(args) => {
            let text = std::fs::read_to_string(&args.script)
                .with_context(|| format!("failed to read {}", args.script.display()))?;
            let script = replay::parse(&text)
                .with_context(|| format!("malformed script {}", args.script.display()))?;
            let report = replay::run(&config, &script)?;
            print_json(&report)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Initialize tracing subscriber with the given log level and output format.
///
/// Pass `format = "json"` for structured JSON output. Any other value
/// defaults to human-readable text. Both write to stderr.
fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_str));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}
