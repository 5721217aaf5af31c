//! Random signal strategy — the null baseline.
//!
//! Emits a uniformly chosen direction and a uniform `[0, 1]` strength for
//! every bar. Useful for checking that the rest of the pipeline carries no
//! hidden edge: a random strategy should score near zero after costs.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::bus::{EventHandler, Outbox};
use crate::events::{Direction, Event, EventKind, SignalEvent};
use crate::num::round_dp;

/// Uniform random signal generator with an owned seeded RNG.
pub struct RandomWalk {
    rng: StdRng,
}

impl RandomWalk {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl EventHandler for RandomWalk {
    fn subscriptions(&self) -> &'static [EventKind] {
        &[EventKind::MarketData]
    }

    fn on_event(&mut self, event: &Event, outbox: &mut Outbox<'_>) {
        let Event::MarketData(bar) = event else {
            return;
        };
        let direction = match self.rng.gen_range(0..3) {
            0 => Direction::Buy,
            1 => Direction::Sell,
            _ => Direction::Hold,
        };
        let strength = round_dp(self.rng.gen::<f64>(), 4);
        outbox.publish(Event::Signal(SignalEvent {
            symbol: bar.symbol.clone(),
            timestamp: bar.timestamp,
            direction,
            strength,
        }));
    }
}
