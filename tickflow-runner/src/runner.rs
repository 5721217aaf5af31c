//! Single-backtest runner: config in, report out.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use tickflow_core::bus::{shared, EventBus};
use tickflow_core::execution::ExecutionSimulator;
use tickflow_core::metrics::{PerformanceMetrics, PerformanceReport};
use tickflow_core::order::OrderManager;
use tickflow_core::portfolio::PortfolioTracker;
use tickflow_core::risk::RiskManager;
use tickflow_core::strategy::{build_strategy, StrategyError};

use crate::config::{ConfigError, DataSource, RunConfig, RunId};
use crate::feed::{CsvFeed, FeedError, SyntheticFeed};
use crate::journal::{EventJournal, JournalError};
use crate::tape::EventTape;

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Strategy(#[from] StrategyError),

    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error(transparent)]
    Journal(#[from] JournalError),
}

/// Outcome of one backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    pub run_id: RunId,
    pub symbol: String,
    pub bars: usize,
    pub events_processed: usize,
    pub performance: PerformanceReport,
}

impl fmt::Display for BacktestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Run      : {}", self.run_id)?;
        writeln!(f, "Symbol   : {}", self.symbol)?;
        writeln!(f, "Bars     : {}", self.bars)?;
        writeln!(f, "Events   : {}", self.events_processed)?;
        write!(f, "{}", self.performance)
    }
}

/// Wires a full pipeline from a [`RunConfig`] and drains it.
///
/// Stages attach in pipeline order — strategy, orders, risk, execution,
/// portfolio, metrics — then the passive observers (tape, journal). All
/// bars are queued before the first dispatch, so event kinds drain in
/// waves.
pub struct BacktestRunner {
    config: RunConfig,
}

impl BacktestRunner {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    pub fn run(&self) -> Result<BacktestReport, RunError> {
        Ok(self.run_with_curve()?.0)
    }

    /// Runs and also returns the equity curve, for callers that want
    /// more than the summary report.
    pub fn run_with_curve(&self) -> Result<(BacktestReport, Vec<f64>), RunError> {
        self.config.validate()?;
        let run_id = self.config.run_id();
        let sim = &self.config.simulation;
        info!(run_id = %run_id, symbol = %sim.symbol, bars = sim.bars, "starting backtest");

        let mut bus = EventBus::new();
        bus.attach(build_strategy(&self.config.strategy, sim.seed)?);
        bus.attach(shared(OrderManager::new(self.config.orders.quantity)));
        bus.attach(shared(RiskManager::new(
            self.config.risk.max_position,
            self.config.risk.max_drawdown_pct,
            self.config.portfolio.starting_cash,
        )));
        bus.attach(shared(ExecutionSimulator::new(
            self.config.execution.slippage_bps,
            self.config.execution.commission_per_share,
            sim.seed,
        )));
        bus.attach(shared(PortfolioTracker::new(
            self.config.portfolio.starting_cash,
        )));

        let metrics = shared(PerformanceMetrics::new(self.config.portfolio.starting_cash));
        bus.attach(metrics.clone());
        bus.attach(shared(EventTape::new()));

        let journal = if self.config.journal.enabled {
            let dir = self.config.journal.dir.join(&run_id[..12]);
            let journal = shared(EventJournal::create(dir)?);
            bus.attach(journal.clone());
            Some(journal)
        } else {
            None
        };

        let bars = match sim.source {
            DataSource::Synthetic => {
                SyntheticFeed::new(sim.symbol.clone(), sim.bars, sim.seed).emit(&mut bus)
            }
            DataSource::Csv => {
                // validate() guarantees the path is present.
                let path = sim.csv_path.clone().ok_or(ConfigError::MissingCsvPath)?;
                CsvFeed::new(sim.symbol.clone(), path).emit(&mut bus)?
            }
        };

        let events_processed = bus.run(None);
        drop(bus);

        if let Some(journal) = journal {
            journal.borrow_mut().finish()?;
        }

        let metrics = metrics.borrow();
        let performance = metrics.report();
        info!(
            run_id = %run_id,
            events = events_processed,
            final_equity = performance.final_equity,
            "backtest complete"
        );

        let report = BacktestReport {
            run_id,
            symbol: sim.symbol.clone(),
            bars,
            events_processed,
            performance,
        };
        Ok((report, metrics.equity_curve().to_vec()))
    }
}
