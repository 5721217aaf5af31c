//! Portfolio stage — positions, weighted-average cost, P&L, cash, equity.

use std::collections::HashMap;

use crate::bus::{EventHandler, Outbox};
use crate::events::{
    Direction, Event, EventKind, FillEvent, MarketDataEvent, PortfolioUpdateEvent,
};
use crate::num::round_dp;

pub const DEFAULT_STARTING_CASH: f64 = 100_000.0;

/// Books every fill and publishes one `PortfolioUpdateEvent` per fill.
///
/// Buys update the weighted-average cost; sells realize P&L against it and
/// reset it to zero when the position returns to flat. Equity marks every
/// open position to its last observed close, falling back to average cost
/// for symbols that have never ticked.
pub struct PortfolioTracker {
    cash: f64,
    positions: HashMap<String, i64>,
    avg_cost: HashMap<String, f64>,
    realized_pnl: HashMap<String, f64>,
    last_close: HashMap<String, f64>,
}

impl PortfolioTracker {
    pub fn new(starting_cash: f64) -> Self {
        Self {
            cash: starting_cash,
            positions: HashMap::new(),
            avg_cost: HashMap::new(),
            realized_pnl: HashMap::new(),
            last_close: HashMap::new(),
        }
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn position(&self, symbol: &str) -> i64 {
        self.positions.get(symbol).copied().unwrap_or(0)
    }

    pub fn avg_cost(&self, symbol: &str) -> f64 {
        self.avg_cost.get(symbol).copied().unwrap_or(0.0)
    }

    pub fn realized_pnl(&self, symbol: &str) -> f64 {
        self.realized_pnl.get(symbol).copied().unwrap_or(0.0)
    }

    /// Cash plus mark-to-market value of all open positions.
    fn equity(&self) -> f64 {
        let holdings: f64 = self
            .positions
            .iter()
            .map(|(symbol, &position)| {
                let mark = self
                    .last_close
                    .get(symbol)
                    .copied()
                    .unwrap_or_else(|| self.avg_cost(symbol));
                position as f64 * mark
            })
            .sum();
        self.cash + holdings
    }

    fn on_fill(&mut self, fill: &FillEvent, outbox: &mut Outbox<'_>) {
        let symbol = &fill.symbol;
        let qty = fill.quantity as i64;
        let price = fill.fill_price;

        let mut position = self.position(symbol);
        let mut avg = self.avg_cost(symbol);
        let mut realized = self.realized_pnl(symbol);

        match fill.direction {
            Direction::Buy => {
                let total_cost = avg * position as f64 + price * qty as f64;
                position += qty;
                avg = if position != 0 {
                    total_cost / position as f64
                } else {
                    0.0
                };
                self.cash -= price * qty as f64 + fill.commission;
            }
            _ => {
                realized += (price - avg) * qty as f64;
                position -= qty;
                self.cash += price * qty as f64 - fill.commission;
                if position == 0 {
                    avg = 0.0;
                }
            }
        }

        self.positions.insert(symbol.clone(), position);
        self.avg_cost.insert(symbol.clone(), avg);
        self.realized_pnl.insert(symbol.clone(), realized);

        // Mark against the last close, or this fill if the symbol has
        // never ticked.
        let last = self.last_close.get(symbol).copied().unwrap_or(price);
        let unrealized = if position != 0 {
            (last - avg) * position as f64
        } else {
            0.0
        };

        outbox.publish(Event::PortfolioUpdate(PortfolioUpdateEvent {
            symbol: symbol.clone(),
            timestamp: fill.timestamp,
            position,
            avg_cost: round_dp(avg, 4),
            realized_pnl: round_dp(realized, 4),
            unrealized_pnl: round_dp(unrealized, 4),
            cash: round_dp(self.cash, 4),
            equity: round_dp(self.equity(), 4),
        }));
    }
}

impl Default for PortfolioTracker {
    fn default() -> Self {
        Self::new(DEFAULT_STARTING_CASH)
    }
}

impl EventHandler for PortfolioTracker {
    fn subscriptions(&self) -> &'static [EventKind] {
        &[EventKind::Fill, EventKind::MarketData]
    }

    fn on_event(&mut self, event: &Event, outbox: &mut Outbox<'_>) {
        match event {
            Event::Fill(fill) => self.on_fill(fill, outbox),
            Event::MarketData(bar) => {
                self.last_close.insert(bar.symbol.clone(), bar.close);
            }
            _ => {}
        }
    }
}
