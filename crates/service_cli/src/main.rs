//! losssim CLI - Command Line Operations for Loss Simulation
//!
//! This is the operational entry point for the loss_engine library.
//!
//! # Commands
//!
//! - `losssim simulate --lambda <λ> --mu <μ> --sigma <σ> --samples <N>` - Run a simulation
//! - `losssim check` - Show hardware parallelism and effective configuration
//!
//! # Configuration
//!
//! Settings are layered: command line arguments override `LOSSSIM_*`
//! environment variables, which override the TOML file given by `--config`,
//! which overrides built-in defaults.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod config;
mod error;

pub use error::{CliError, Result};

use config::LogLevel;

/// Parallel compound Poisson-lognormal loss simulator
#[derive(Parser)]
#[command(name = "losssim")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output (debug-level logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path (TOML)
    #[arg(short, long, global = true, env = "LOSSSIM_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate aggregate losses
    Simulate(commands::simulate::SimulateArgs),

    /// Check system configuration and dependencies
    Check,
}

/// Initialise tracing, honouring `RUST_LOG` when set.
fn init_tracing(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "service_cli={level},loss_engine={level}",
            level = level.as_filter_str()
        ))
    });

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = config::build_config(cli.config.as_deref())?;
    let level = if cli.verbose {
        LogLevel::Debug
    } else {
        config.log_level
    };
    init_tracing(level);

    if cli.verbose {
        info!("Verbose mode enabled");
    }
    if let Some(path) = &cli.config {
        info!("Loaded configuration from {}", path.display());
    }

    match cli.command {
        Commands::Simulate(args) => commands::simulate::run(&args, &config),
        Commands::Check => commands::check::run(&config),
    }
}
