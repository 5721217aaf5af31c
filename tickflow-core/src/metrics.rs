//! Metrics stage — equity curve, drawdown, Sharpe, and win rate.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::bus::{EventHandler, Outbox};
use crate::events::{Direction, Event, EventKind, FillEvent, PortfolioUpdateEvent};
use crate::num::round_dp;

/// Trading periods per year used to annualize the Sharpe ratio.
const PERIODS_PER_YEAR: f64 = 252.0;

/// Final performance figures for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub total_return_pct: f64,
    pub max_drawdown_pct: f64,
    /// Annualized, risk-free rate 0.
    pub sharpe_ratio: f64,
    /// Fraction of trades filled on the right side of their cost basis.
    pub win_rate: f64,
    pub total_trades: usize,
    pub profitable_trades: usize,
    pub final_equity: f64,
}

impl fmt::Display for PerformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(44);
        writeln!(f)?;
        writeln!(f, "{rule}")?;
        writeln!(f, "  PERFORMANCE REPORT")?;
        writeln!(f, "{rule}")?;
        writeln!(f, "  Total return      : {:+.2} %", self.total_return_pct)?;
        writeln!(f, "  Max drawdown      : {:.2} %", self.max_drawdown_pct)?;
        writeln!(f, "  Sharpe ratio      : {:.4}", self.sharpe_ratio)?;
        writeln!(f, "  Win rate          : {:.1} %", self.win_rate * 100.0)?;
        writeln!(f, "  Total trades      : {}", self.total_trades)?;
        writeln!(f, "  Profitable trades : {}", self.profitable_trades)?;
        writeln!(f, "  Final equity      : ${:.2}", self.final_equity)?;
        writeln!(f, "{rule}")
    }
}

struct TradeOutcome {
    cost_basis: f64,
    fill_price: f64,
    direction: Direction,
}

impl TradeOutcome {
    fn is_win(&self) -> bool {
        match self.direction {
            Direction::Buy => self.fill_price > self.cost_basis,
            Direction::Sell => self.fill_price < self.cost_basis,
            Direction::Hold => false,
        }
    }
}

/// Accumulates equity snapshots and trade outcomes; call
/// [`report`](PerformanceMetrics::report) once the bus has drained.
///
/// A trade's cost basis is the avg cost most recently observed for its
/// symbol at the time the fill is dispatched. Portfolio updates arrive a
/// wave after fills, so the basis lags by one wave; this matches the
/// observed pipeline behavior and is intentional.
pub struct PerformanceMetrics {
    starting_equity: f64,
    equity_curve: Vec<f64>,
    peak_equity: f64,
    max_drawdown_pct: f64,
    trades: Vec<TradeOutcome>,
    last_avg_cost: HashMap<String, f64>,
}

impl PerformanceMetrics {
    pub fn new(starting_equity: f64) -> Self {
        Self {
            starting_equity,
            equity_curve: vec![starting_equity],
            peak_equity: starting_equity,
            max_drawdown_pct: 0.0,
            trades: Vec::new(),
            last_avg_cost: HashMap::new(),
        }
    }

    pub fn equity_curve(&self) -> &[f64] {
        &self.equity_curve
    }

    fn on_portfolio_update(&mut self, update: &PortfolioUpdateEvent) {
        let equity = update.equity;
        self.equity_curve.push(equity);
        if equity > self.peak_equity {
            self.peak_equity = equity;
        } else if self.peak_equity > 0.0 {
            let drawdown = (self.peak_equity - equity) / self.peak_equity * 100.0;
            if drawdown > self.max_drawdown_pct {
                self.max_drawdown_pct = drawdown;
            }
        }
        self.last_avg_cost
            .insert(update.symbol.clone(), update.avg_cost);
    }

    fn on_fill(&mut self, fill: &FillEvent) {
        let cost_basis = self
            .last_avg_cost
            .get(&fill.symbol)
            .copied()
            .unwrap_or(fill.fill_price);
        self.trades.push(TradeOutcome {
            cost_basis,
            fill_price: fill.fill_price,
            direction: fill.direction,
        });
    }

    pub fn report(&self) -> PerformanceReport {
        let final_equity = self
            .equity_curve
            .last()
            .copied()
            .unwrap_or(self.starting_equity);
        let total_return =
            (final_equity - self.starting_equity) / self.starting_equity * 100.0;

        let profitable = self.trades.iter().filter(|t| t.is_win()).count();
        let total = self.trades.len();
        let win_rate = if total > 0 {
            profitable as f64 / total as f64
        } else {
            0.0
        };

        PerformanceReport {
            total_return_pct: round_dp(total_return, 4),
            max_drawdown_pct: round_dp(self.max_drawdown_pct, 4),
            sharpe_ratio: round_dp(self.sharpe(), 4),
            win_rate: round_dp(win_rate, 4),
            total_trades: total,
            profitable_trades: profitable,
            final_equity: round_dp(final_equity, 2),
        }
    }

    /// Annualized Sharpe ratio of period-over-period equity returns.
    /// Zero when there are fewer than 2 curve points or the returns are
    /// constant.
    fn sharpe(&self) -> f64 {
        if self.equity_curve.len() < 2 {
            return 0.0;
        }
        let returns: Vec<f64> = self
            .equity_curve
            .windows(2)
            .map(|pair| (pair[1] - pair[0]) / pair[0])
            .collect();
        let n = returns.len() as f64;
        let mean = returns.iter().sum::<f64>() / n;
        let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
        let std = variance.sqrt();
        if std == 0.0 {
            return 0.0;
        }
        mean / std * PERIODS_PER_YEAR.sqrt()
    }
}

impl EventHandler for PerformanceMetrics {
    fn subscriptions(&self) -> &'static [EventKind] {
        &[EventKind::PortfolioUpdate, EventKind::Fill]
    }

    fn on_event(&mut self, event: &Event, _outbox: &mut Outbox<'_>) {
        match event {
            Event::PortfolioUpdate(update) => self.on_portfolio_update(update),
            Event::Fill(fill) => self.on_fill(fill),
            _ => {}
        }
    }
}
