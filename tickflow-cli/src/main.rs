//! TickFlow CLI — run event-driven backtests from TOML configs.
//!
//! Commands:
//! - `run` — execute a backtest from a TOML config file (or defaults)
//! - `config` — print the effective configuration as TOML

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use tickflow_runner::{BacktestRunner, RunConfig};

#[derive(Parser)]
#[command(
    name = "tickflow",
    about = "TickFlow CLI — event-driven trading simulation"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a backtest from a TOML config file (defaults when omitted).
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override the configured symbol.
        #[arg(long)]
        symbol: Option<String>,

        /// Override the number of synthetic bars.
        #[arg(long)]
        bars: Option<usize>,

        /// Override the run seed.
        #[arg(long)]
        seed: Option<u64>,

        /// Disable the CSV event journal.
        #[arg(long, default_value_t = false)]
        no_journal: bool,

        /// Print the report as JSON instead of the banner.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Print the effective configuration (defaults plus file) as TOML.
    Config {
        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<RunConfig> {
    match path {
        Some(path) => RunConfig::load(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(RunConfig::default()),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            config,
            symbol,
            bars,
            seed,
            no_journal,
            json,
        } => {
            let mut config = load_config(config.as_ref())?;
            if let Some(symbol) = symbol {
                config.simulation.symbol = symbol;
            }
            if let Some(bars) = bars {
                config.simulation.bars = bars;
            }
            if let Some(seed) = seed {
                config.simulation.seed = seed;
            }
            if no_journal {
                config.journal.enabled = false;
            }

            let report = BacktestRunner::new(config)
                .run()
                .context("backtest failed")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{report}");
            }
            Ok(())
        }
        Commands::Config { config } => {
            let config = load_config(config.as_ref())?;
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
    }
}
