//! Tracing event tape.
//!
//! A passive observer that logs every event through `tracing`, one line
//! per event. Vetoes log at warn; everything else at info. Like the
//! journal, it never publishes.

use tracing::{info, warn};

use tickflow_core::bus::{EventHandler, Outbox};
use tickflow_core::events::{Event, EventKind};

#[derive(Debug, Default)]
pub struct EventTape {
    seen: u64,
}

impl EventTape {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of events observed so far.
    pub fn seen(&self) -> u64 {
        self.seen
    }
}

impl EventHandler for EventTape {
    fn subscriptions(&self) -> &'static [EventKind] {
        &EventKind::ALL
    }

    fn on_event(&mut self, event: &Event, _outbox: &mut Outbox<'_>) {
        self.seen += 1;
        match event {
            Event::MarketData(e) => {
                info!(target: "tape::market_data", symbol = %e.symbol, close = e.close, volume = e.volume, "bar");
            }
            Event::Signal(e) => {
                info!(target: "tape::signal", symbol = %e.symbol, direction = ?e.direction, strength = e.strength, "signal");
            }
            Event::Order(e) => {
                info!(target: "tape::order", order_id = %e.order_id, symbol = %e.symbol, direction = ?e.direction, quantity = e.quantity, price = e.price, "order");
            }
            Event::ApprovedOrder(e) => {
                info!(target: "tape::approved_order", order_id = %e.order_id, symbol = %e.symbol, quantity = e.quantity, "approved");
            }
            Event::RiskVeto(e) => {
                warn!(target: "tape::risk_veto", order_id = %e.order_id, symbol = %e.symbol, reason = %e.reason, "veto");
            }
            Event::Fill(e) => {
                info!(target: "tape::fill", fill_id = %e.fill_id, order_id = %e.order_id, fill_price = e.fill_price, commission = e.commission, "fill");
            }
            Event::PortfolioUpdate(e) => {
                info!(target: "tape::portfolio_update", symbol = %e.symbol, position = e.position, cash = e.cash, equity = e.equity, "portfolio");
            }
        }
    }
}
