//! Moving average crossover strategy — fast/slow SMA cross detection.
//!
//! BUY when the fast SMA crosses above the slow SMA relative to the
//! previous bar's pair, SELL on the mirror downward cross, HOLD otherwise.
//! The first fully-warmed bar has no prior SMA pair and is always HOLD.

use std::collections::{HashMap, VecDeque};

use crate::bus::{EventHandler, Outbox};
use crate::events::{Direction, Event, EventKind, MarketDataEvent, SignalEvent};
use crate::num::round_dp;

use super::StrategyError;

/// SMA crossover signal generator.
///
/// Keeps a bounded window of the last `slow` closes per symbol. During
/// warm-up (fewer than `slow` closes seen) every bar emits HOLD with
/// strength 0. Signal strength is the normalized SMA gap
/// `|fast − slow| / slow`, rounded to 6 decimal places.
pub struct MaCrossover {
    fast: usize,
    slow: usize,
    windows: HashMap<String, VecDeque<f64>>,
    prev_fast: HashMap<String, f64>,
    prev_slow: HashMap<String, f64>,
}

impl MaCrossover {
    pub fn new(fast: usize, slow: usize) -> Result<Self, StrategyError> {
        if fast >= slow {
            return Err(StrategyError::FastNotBelowSlow { fast, slow });
        }
        Ok(Self {
            fast,
            slow,
            windows: HashMap::new(),
            prev_fast: HashMap::new(),
            prev_slow: HashMap::new(),
        })
    }

    fn on_bar(&mut self, bar: &MarketDataEvent, outbox: &mut Outbox<'_>) {
        let window = self.windows.entry(bar.symbol.clone()).or_default();
        window.push_back(bar.close);
        if window.len() > self.slow {
            window.pop_front();
        }

        if window.len() < self.slow {
            emit(outbox, bar, Direction::Hold, 0.0);
            return;
        }

        let sma_fast = window.iter().rev().take(self.fast).sum::<f64>() / self.fast as f64;
        let sma_slow = window.iter().sum::<f64>() / self.slow as f64;
        let strength = if sma_slow != 0.0 {
            round_dp((sma_fast - sma_slow).abs() / sma_slow, 6)
        } else {
            0.0
        };

        let direction = match (
            self.prev_fast.get(&bar.symbol),
            self.prev_slow.get(&bar.symbol),
        ) {
            (Some(&prev_fast), Some(&prev_slow)) => {
                if prev_fast <= prev_slow && sma_fast > sma_slow {
                    Direction::Buy
                } else if prev_fast >= prev_slow && sma_fast < sma_slow {
                    Direction::Sell
                } else {
                    Direction::Hold
                }
            }
            _ => Direction::Hold,
        };

        self.prev_fast.insert(bar.symbol.clone(), sma_fast);
        self.prev_slow.insert(bar.symbol.clone(), sma_slow);

        emit(outbox, bar, direction, strength);
    }
}

fn emit(outbox: &mut Outbox<'_>, bar: &MarketDataEvent, direction: Direction, strength: f64) {
    outbox.publish(Event::Signal(SignalEvent {
        symbol: bar.symbol.clone(),
        timestamp: bar.timestamp,
        direction,
        strength,
    }));
}

impl EventHandler for MaCrossover {
    fn subscriptions(&self) -> &'static [EventKind] {
        &[EventKind::MarketData]
    }

    fn on_event(&mut self, event: &Event, outbox: &mut Outbox<'_>) {
        if let Event::MarketData(bar) = event {
            self.on_bar(bar, outbox);
        }
    }
}
