//! Execution stage — fills approved orders with slippage and commission.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::bus::{EventHandler, Outbox};
use crate::events::{ApprovedOrderEvent, Event, EventKind, FillEvent, FillId};
use crate::num::round_dp;

pub const DEFAULT_SLIPPAGE_BPS: f64 = 1.0;
pub const DEFAULT_COMMISSION_PER_SHARE: f64 = 0.01;

/// Reference price used when an order carries no price (symbol never
/// ticked before the order stage ran).
const FALLBACK_PRICE: f64 = 150.0;

/// Simulates immediate fills for approved orders.
///
/// Slippage is drawn uniformly in `±slippage_bps` basis points of the
/// reference price from an owned seeded RNG; commission is linear per
/// share. Both are rounded to 4 decimal places.
pub struct ExecutionSimulator {
    slippage_bps: f64,
    commission_per_share: f64,
    rng: StdRng,
    next_fill: u64,
}

impl ExecutionSimulator {
    pub fn new(slippage_bps: f64, commission_per_share: f64, seed: u64) -> Self {
        Self {
            slippage_bps,
            commission_per_share,
            rng: StdRng::seed_from_u64(seed),
            next_fill: 0,
        }
    }

    fn next_fill_id(&mut self) -> FillId {
        self.next_fill += 1;
        FillId(format!("fill-{:06}", self.next_fill))
    }

    fn on_approved(&mut self, order: &ApprovedOrderEvent, outbox: &mut Outbox<'_>) {
        let reference = if order.price > 0.0 {
            order.price
        } else {
            FALLBACK_PRICE
        };
        let slip = reference * (self.slippage_bps / 10_000.0) * self.rng.gen_range(-1.0..1.0);
        let fill_price = round_dp(reference + slip, 4);
        let commission = round_dp(order.quantity as f64 * self.commission_per_share, 4);

        outbox.publish(Event::Fill(FillEvent {
            fill_id: self.next_fill_id(),
            order_id: order.order_id.clone(),
            symbol: order.symbol.clone(),
            timestamp: order.timestamp,
            direction: order.direction,
            quantity: order.quantity,
            fill_price,
            commission,
        }));
    }
}

impl Default for ExecutionSimulator {
    fn default() -> Self {
        Self::new(DEFAULT_SLIPPAGE_BPS, DEFAULT_COMMISSION_PER_SHARE, 0)
    }
}

impl EventHandler for ExecutionSimulator {
    fn subscriptions(&self) -> &'static [EventKind] {
        &[EventKind::ApprovedOrder]
    }

    fn on_event(&mut self, event: &Event, outbox: &mut Outbox<'_>) {
        if let Event::ApprovedOrder(order) = event {
            self.on_approved(order, outbox);
        }
    }
}
