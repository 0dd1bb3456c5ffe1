//! Ponder - thinking-budget sampling and a ReAct agent for reasoning models.
//!
//! Main entry point for the Ponder CLI.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use console::Style;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};

mod commands;

use commands::{agent, budget, config, sample};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Ponder - thinking-budget sampling and a ReAct agent for reasoning models
#[derive(Parser)]
#[command(name = "ponder")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file loaded on top of the discovered ones
    #[arg(long, global = true, env = "PONDER_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Reason within a thinking-token budget, then answer
    Budget(budget::BudgetArgs),

    /// Generate once without a budget, for comparison
    Sample(sample::SampleArgs),

    /// Answer a question with the ReAct agent and its tools
    Agent(agent::AgentArgs),

    /// Configuration management
    Config(config::ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = init_tracing(cli.verbose);

    let loaded = ponder_config::load_config_with_options(&ponder_config::DiscoveryOptions {
        explicit_file: cli.config.clone(),
        ..Default::default()
    })?;

    let yellow = Style::new().yellow();
    for warning in &loaded.warnings {
        eprintln!("{} {}", yellow.apply_to("warning:"), warning);
    }

    let ctx = commands::Context {
        loaded,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Budget(args) => budget::run(args, &ctx).await,
        Commands::Sample(args) => sample::run(args, &ctx).await,
        Commands::Agent(args) => agent::run(args, &ctx).await,
        Commands::Config(args) => config::run(args, &ctx).await,
    }
}

/// Console logging to stderr plus a daily-rotating JSON file in the user
/// config directory. The file layer is skipped if the directory is
/// unusable.
fn init_tracing(verbose: bool) -> Option<WorkerGuard> {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = if verbose {
        "ponder=debug,ponder_budget=debug,ponder_agent=debug,ponder_llm=debug,ponder_config=debug,info"
    } else {
        "ponder=info,ponder_budget=info,ponder_agent=info,ponder_llm=warn,warn"
    };

    let log_dir = ponder_config::log_dir().unwrap_or_else(|| PathBuf::from("logs"));
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("ponder.log")
        .build(&log_dir)
        .ok();

    let (file_layer, guard) = match appender {
        Some(appender) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(EnvFilter::new(
                    "ponder=trace,ponder_budget=trace,ponder_agent=trace,ponder_llm=trace,ponder_config=trace,info",
                ));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(EnvFilter::new(filter)),
        )
        .with(file_layer)
        .init();

    guard
}
