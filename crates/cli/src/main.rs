//! WikiWatch CLI - Main Entry Point
//!
//! Runs the Wikipedia watchlist round trip in a real browser and reports
//! each step.

use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{check, run, scenario};

/// WikiWatch - Wikipedia watchlist end-to-end check
#[derive(Parser)]
#[command(name = "wikiwatch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the watchlist scenario
    Run(run::RunArgs),

    /// Show the effective scenario
    Scenario(scenario::ScenarioArgs),

    /// Check the site and the Playwright installation
    Check(check::CheckArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose {
        "wikiwatch_e2e=debug,info"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let code = match cli.command {
        Commands::Run(args) => run::execute(args, cli.format).await,
        Commands::Scenario(args) => scenario::execute(args, cli.format)?,
        Commands::Check(args) => check::execute(args, cli.format).await?,
    };

    std::process::exit(code);
}
