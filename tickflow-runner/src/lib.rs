//! TickFlow Runner — backtest orchestration on top of `tickflow-core`.
//!
//! This crate builds on `tickflow-core` to provide:
//! - Run configuration (TOML) with content-addressable run IDs
//! - Market data feeds (seeded synthetic walk, CSV replay)
//! - A CSV event journal and a tracing event tape
//! - The backtest runner that wires a full pipeline from config

pub mod config;
pub mod feed;
pub mod journal;
pub mod runner;
pub mod tape;

pub use config::{ConfigError, DataSource, RunConfig, RunId};
pub use feed::{CsvFeed, FeedError, SyntheticFeed};
pub use journal::{EventJournal, JournalError};
pub use runner::{BacktestReport, BacktestRunner, RunError};
pub use tape::EventTape;
