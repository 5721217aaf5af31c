//! Risk stage — vetoes orders that breach position or drawdown limits.
//!
//! A veto is a normal protocol outcome carried by `RiskVetoEvent`, never
//! an error. Every `OrderEvent` results in exactly one of
//! `ApprovedOrderEvent` or `RiskVetoEvent`.

use std::collections::HashMap;

use crate::bus::{EventHandler, Outbox};
use crate::events::{
    ApprovedOrderEvent, Direction, Event, EventKind, OrderEvent, PortfolioUpdateEvent,
    RiskVetoEvent,
};

pub const DEFAULT_MAX_POSITION: i64 = 500;
pub const DEFAULT_MAX_DRAWDOWN_PCT: f64 = 10.0;

/// Gatekeeper between the order stage and execution.
///
/// Maintains a shadow view of net positions and equity synced from
/// `PortfolioUpdateEvent`. Because portfolio updates arrive one dispatch
/// wave after the orders they resulted from, this view lags the orders
/// currently being evaluated; that lag is part of the pipeline's observed
/// behavior and is deliberately kept.
pub struct RiskManager {
    max_position: i64,
    max_drawdown_pct: f64,
    positions: HashMap<String, i64>,
    peak_equity: f64,
    current_equity: f64,
}

impl RiskManager {
    pub fn new(max_position: i64, max_drawdown_pct: f64, starting_equity: f64) -> Self {
        Self {
            max_position,
            max_drawdown_pct,
            positions: HashMap::new(),
            peak_equity: starting_equity,
            current_equity: starting_equity,
        }
    }

    fn on_portfolio_update(&mut self, update: &PortfolioUpdateEvent) {
        self.current_equity = update.equity;
        if update.equity > self.peak_equity {
            self.peak_equity = update.equity;
        }
        self.positions.insert(update.symbol.clone(), update.position);
    }

    fn on_order(&mut self, order: &OrderEvent, outbox: &mut Outbox<'_>) {
        let signed_qty = match order.direction {
            Direction::Buy => order.quantity as i64,
            _ => -(order.quantity as i64),
        };
        let current = self.positions.get(&order.symbol).copied().unwrap_or(0);
        let new_position = current + signed_qty;

        if new_position.abs() > self.max_position {
            self.veto(
                order,
                format!(
                    "position limit exceeded: |{new_position}| > {}",
                    self.max_position
                ),
                outbox,
            );
            return;
        }

        if self.peak_equity > 0.0 {
            let drawdown_pct =
                (self.peak_equity - self.current_equity) / self.peak_equity * 100.0;
            if drawdown_pct > self.max_drawdown_pct {
                self.veto(
                    order,
                    format!(
                        "max drawdown exceeded: {drawdown_pct:.2}% > {}%",
                        self.max_drawdown_pct
                    ),
                    outbox,
                );
                return;
            }
        }

        outbox.publish(Event::ApprovedOrder(ApprovedOrderEvent {
            order_id: order.order_id.clone(),
            symbol: order.symbol.clone(),
            timestamp: order.timestamp,
            order_type: order.order_type,
            direction: order.direction,
            quantity: order.quantity,
            price: order.price,
        }));
    }

    fn veto(&self, order: &OrderEvent, reason: String, outbox: &mut Outbox<'_>) {
        outbox.publish(Event::RiskVeto(RiskVetoEvent {
            order_id: order.order_id.clone(),
            symbol: order.symbol.clone(),
            timestamp: order.timestamp,
            reason,
        }));
    }
}

impl Default for RiskManager {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_POSITION, DEFAULT_MAX_DRAWDOWN_PCT, 100_000.0)
    }
}

impl EventHandler for RiskManager {
    fn subscriptions(&self) -> &'static [EventKind] {
        &[EventKind::Order, EventKind::PortfolioUpdate]
    }

    fn on_event(&mut self, event: &Event, outbox: &mut Outbox<'_>) {
        match event {
            Event::Order(order) => self.on_order(order, outbox),
            Event::PortfolioUpdate(update) => self.on_portfolio_update(update),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{shared, EventBus};
    use crate::events::{OrderId, OrderType};
    use chrono::{TimeZone, Utc};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Outcomes {
        approved: Vec<ApprovedOrderEvent>,
        vetoed: Vec<RiskVetoEvent>,
    }

    struct OutcomeCollector {
        outcomes: Rc<RefCell<Outcomes>>,
    }

    impl EventHandler for OutcomeCollector {
        fn subscriptions(&self) -> &'static [EventKind] {
            &[EventKind::ApprovedOrder, EventKind::RiskVeto]
        }
        fn on_event(&mut self, event: &Event, _outbox: &mut Outbox<'_>) {
            match event {
                Event::ApprovedOrder(e) => self.outcomes.borrow_mut().approved.push(e.clone()),
                Event::RiskVeto(e) => self.outcomes.borrow_mut().vetoed.push(e.clone()),
                _ => {}
            }
        }
    }

    fn ts() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 9, 30, 0).unwrap()
    }

    fn order(id: u32, direction: Direction, quantity: u32) -> Event {
        Event::Order(OrderEvent {
            order_id: OrderId(format!("ord-{id}")),
            symbol: "AAPL".into(),
            timestamp: ts(),
            order_type: OrderType::Market,
            direction,
            quantity,
            price: 150.0,
        })
    }

    fn update(position: i64, equity: f64) -> Event {
        Event::PortfolioUpdate(PortfolioUpdateEvent {
            symbol: "AAPL".into(),
            timestamp: ts(),
            position,
            avg_cost: 150.0,
            realized_pnl: 0.0,
            unrealized_pnl: 0.0,
            cash: equity,
            equity,
        })
    }

    fn harness(manager: RiskManager) -> (EventBus, Rc<RefCell<Outcomes>>) {
        let outcomes = Rc::new(RefCell::new(Outcomes::default()));
        let mut bus = EventBus::new();
        bus.attach(shared(manager));
        bus.attach(shared(OutcomeCollector {
            outcomes: Rc::clone(&outcomes),
        }));
        (bus, outcomes)
    }

    #[test]
    fn order_within_limits_is_approved_unchanged() {
        let (mut bus, outcomes) = harness(RiskManager::new(500, 10.0, 100_000.0));
        bus.publish(order(1, Direction::Buy, 100));
        bus.run(None);

        let outcomes = outcomes.borrow();
        assert_eq!(outcomes.approved.len(), 1);
        assert!(outcomes.vetoed.is_empty());
        let approved = &outcomes.approved[0];
        assert_eq!(approved.order_id, OrderId("ord-1".into()));
        assert_eq!(approved.quantity, 100);
        assert_eq!(approved.price, 150.0);
    }

    #[test]
    fn oversized_order_is_vetoed_with_position_limit_reason() {
        let (mut bus, outcomes) = harness(RiskManager::new(500, 10.0, 100_000.0));
        bus.publish(order(1, Direction::Buy, 600));
        bus.run(None);

        let outcomes = outcomes.borrow();
        assert!(outcomes.approved.is_empty());
        assert_eq!(outcomes.vetoed.len(), 1);
        assert!(outcomes.vetoed[0].reason.contains("position limit"));
    }

    #[test]
    fn short_side_position_limit_also_applies() {
        let (mut bus, outcomes) = harness(RiskManager::new(500, 10.0, 100_000.0));
        bus.publish(update(-450, 100_000.0));
        bus.publish(order(1, Direction::Sell, 100));
        bus.run(None);

        let outcomes = outcomes.borrow();
        assert_eq!(outcomes.vetoed.len(), 1);
        assert!(outcomes.vetoed[0].reason.contains("position limit"));
    }

    #[test]
    fn drawdown_breach_vetoes_the_next_order() {
        let (mut bus, outcomes) = harness(RiskManager::new(500, 5.0, 100_000.0));
        // Peak 100,000, equity falls to 90,000 → 10% drawdown > 5% cap.
        bus.publish(update(0, 90_000.0));
        bus.publish(order(1, Direction::Buy, 100));
        bus.run(None);

        let outcomes = outcomes.borrow();
        assert!(outcomes.approved.is_empty());
        assert_eq!(outcomes.vetoed.len(), 1);
        assert!(outcomes.vetoed[0].reason.contains("drawdown"));
    }

    #[test]
    fn recovered_equity_lifts_the_drawdown_veto() {
        let (mut bus, outcomes) = harness(RiskManager::new(500, 5.0, 100_000.0));
        bus.publish(update(0, 90_000.0));
        bus.publish(update(0, 99_000.0));
        bus.publish(order(1, Direction::Buy, 100));
        bus.run(None);
        assert_eq!(outcomes.borrow().approved.len(), 1);
    }

    #[test]
    fn every_order_gets_exactly_one_outcome() {
        let (mut bus, outcomes) = harness(RiskManager::new(500, 10.0, 100_000.0));
        for i in 0..10 {
            let qty = if i % 3 == 0 { 600 } else { 100 };
            bus.publish(order(i, Direction::Buy, qty));
        }
        bus.run(None);

        let outcomes = outcomes.borrow();
        assert_eq!(outcomes.approved.len() + outcomes.vetoed.len(), 10);
    }

    #[test]
    fn peak_equity_ratchets_up() {
        let (mut bus, outcomes) = harness(RiskManager::new(500, 5.0, 100_000.0));
        // New peak 120,000; equity 115,000 is only a 4.17% drawdown.
        bus.publish(update(0, 120_000.0));
        bus.publish(update(0, 115_000.0));
        bus.publish(order(1, Direction::Buy, 100));
        bus.run(None);
        assert_eq!(outcomes.borrow().approved.len(), 1);

        // 113,000 against the 120,000 peak is 5.83% — vetoed.
        bus.publish(update(0, 113_000.0));
        bus.publish(order(2, Direction::Buy, 100));
        bus.run(None);
        assert_eq!(outcomes.borrow().vetoed.len(), 1);
    }
}
