//! Order stage — converts non-HOLD signals into fixed-lot market orders.

use std::collections::HashMap;

use crate::bus::{EventHandler, Outbox};
use crate::events::{
    Direction, Event, EventKind, OrderEvent, OrderId, OrderType, SignalEvent,
};

pub const DEFAULT_QUANTITY: u32 = 100;

/// Turns every BUY or SELL signal into one MARKET [`OrderEvent`].
///
/// Tracks the most recently observed close per symbol and tags each order
/// with it as the reference price (0.0 when the symbol has never ticked).
/// Because the bus dispatches in breadth-first waves, that close is the
/// last bar of the feed, not the bar that produced the signal — downstream
/// stages rely on this exact behavior. HOLD signals are discarded
/// silently.
pub struct OrderManager {
    quantity: u32,
    next_order: u64,
    last_close: HashMap<String, f64>,
}

impl OrderManager {
    pub fn new(quantity: u32) -> Self {
        Self {
            quantity,
            next_order: 0,
            last_close: HashMap::new(),
        }
    }

    fn next_order_id(&mut self) -> OrderId {
        self.next_order += 1;
        OrderId(format!("ord-{:06}", self.next_order))
    }

    fn on_signal(&mut self, signal: &SignalEvent, outbox: &mut Outbox<'_>) {
        if signal.direction == Direction::Hold {
            return;
        }
        let price = self.last_close.get(&signal.symbol).copied().unwrap_or(0.0);
        let order = OrderEvent {
            order_id: self.next_order_id(),
            symbol: signal.symbol.clone(),
            timestamp: signal.timestamp,
            order_type: OrderType::Market,
            direction: signal.direction,
            quantity: self.quantity,
            price,
        };
        outbox.publish(Event::Order(order));
    }
}

impl Default for OrderManager {
    fn default() -> Self {
        Self::new(DEFAULT_QUANTITY)
    }
}

impl EventHandler for OrderManager {
    fn subscriptions(&self) -> &'static [EventKind] {
        &[EventKind::MarketData, EventKind::Signal]
    }

    fn on_event(&mut self, event: &Event, outbox: &mut Outbox<'_>) {
        match event {
            Event::MarketData(bar) => {
                self.last_close.insert(bar.symbol.clone(), bar.close);
            }
            Event::Signal(signal) => self.on_signal(signal, outbox),
            _ => {}
        }
    }
}
