//! RSI zone-crossover strategy.
//!
//! The signal fires on the transition into a zone, not on the level:
//! BUY exactly when RSI crosses below the oversold threshold since the
//! previous bar, SELL on the mirror crossing above overbought.

use std::collections::{HashMap, VecDeque};

use crate::bus::{EventHandler, Outbox};
use crate::events::{Direction, Event, EventKind, MarketDataEvent, SignalEvent};
use crate::num::round_dp;

use super::StrategyError;

/// Relative Strength Index zone-crossover signal generator.
///
/// Keeps `period + 1` closes per symbol (`period` deltas). Averages divide
/// by `period` regardless of how many deltas were gains or losses; RSI is
/// 100 when there are no losses. Strength is `min(|RSI − 50| / 50, 1)`
/// rounded to 6 decimal places.
#[derive(Debug)]
pub struct RsiZone {
    period: usize,
    overbought: f64,
    oversold: f64,
    windows: HashMap<String, VecDeque<f64>>,
    prev_rsi: HashMap<String, f64>,
}

impl RsiZone {
    pub fn new(period: usize, overbought: f64, oversold: f64) -> Result<Self, StrategyError> {
        if period < 2 {
            return Err(StrategyError::PeriodTooShort(period));
        }
        if oversold >= overbought {
            return Err(StrategyError::InvertedZones {
                oversold,
                overbought,
            });
        }
        Ok(Self {
            period,
            overbought,
            oversold,
            windows: HashMap::new(),
            prev_rsi: HashMap::new(),
        })
    }

    fn on_bar(&mut self, bar: &MarketDataEvent, outbox: &mut Outbox<'_>) {
        let window = self.windows.entry(bar.symbol.clone()).or_default();
        window.push_back(bar.close);
        if window.len() > self.period + 1 {
            window.pop_front();
        }

        if window.len() < self.period + 1 {
            self.emit(outbox, bar, Direction::Hold, 0.0);
            return;
        }

        let prices: Vec<f64> = window.iter().copied().collect();
        let mut gain_sum = 0.0;
        let mut loss_sum = 0.0;
        for pair in prices.windows(2) {
            let change = pair[1] - pair[0];
            if change > 0.0 {
                gain_sum += change;
            } else if change < 0.0 {
                loss_sum += change.abs();
            }
        }
        let avg_gain = gain_sum / self.period as f64;
        let avg_loss = loss_sum / self.period as f64;

        let rsi = if avg_loss == 0.0 {
            100.0
        } else {
            100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
        };

        let strength = round_dp(((rsi - 50.0).abs() / 50.0).min(1.0), 6);

        let direction = match self.prev_rsi.get(&bar.symbol) {
            Some(&prev) => {
                if prev >= self.oversold && rsi < self.oversold {
                    Direction::Buy
                } else if prev <= self.overbought && rsi > self.overbought {
                    Direction::Sell
                } else {
                    Direction::Hold
                }
            }
            None => Direction::Hold,
        };

        self.prev_rsi.insert(bar.symbol.clone(), rsi);
        self.emit(outbox, bar, direction, strength);
    }

    fn emit(
        &self,
        outbox: &mut Outbox<'_>,
        bar: &MarketDataEvent,
        direction: Direction,
        strength: f64,
    ) {
        outbox.publish(Event::Signal(SignalEvent {
            symbol: bar.symbol.clone(),
            timestamp: bar.timestamp,
            direction,
            strength,
        }));
    }
}

impl EventHandler for RsiZone {
    fn subscriptions(&self) -> &'static [EventKind] {
        &[EventKind::MarketData]
    }

    fn on_event(&mut self, event: &Event, outbox: &mut Outbox<'_>) {
        if let Event::MarketData(bar) = event {
            self.on_bar(bar, outbox);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{shared, EventBus};
    use chrono::{Duration, TimeZone, Utc};
    use std::cell::RefCell;
    use std::rc::Rc;

    struct SignalCollector {
        signals: Rc<RefCell<Vec<SignalEvent>>>,
    }

    impl EventHandler for SignalCollector {
        fn subscriptions(&self) -> &'static [EventKind] {
            &[EventKind::Signal]
        }
        fn on_event(&mut self, event: &Event, _outbox: &mut Outbox<'_>) {
            if let Event::Signal(signal) = event {
                self.signals.borrow_mut().push(signal.clone());
            }
        }
    }

    fn run_closes(strategy: RsiZone, closes: &[f64]) -> Vec<SignalEvent> {
        let signals = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::new();
        bus.attach(shared(strategy));
        bus.attach(shared(SignalCollector {
            signals: Rc::clone(&signals),
        }));

        let start = Utc.with_ymd_and_hms(2024, 1, 2, 9, 30, 0).unwrap();
        for (i, &close) in closes.iter().enumerate() {
            bus.publish(Event::MarketData(MarketDataEvent {
                symbol: "AAPL".into(),
                timestamp: start + Duration::minutes(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1_000,
            }));
        }
        bus.run(None);
        drop(bus);
        Rc::try_unwrap(signals).unwrap().into_inner()
    }

    #[test]
    fn rejects_invalid_parameters() {
        assert_eq!(
            RsiZone::new(1, 70.0, 30.0).unwrap_err(),
            StrategyError::PeriodTooShort(1)
        );
        assert!(matches!(
            RsiZone::new(14, 30.0, 70.0),
            Err(StrategyError::InvertedZones { .. })
        ));
        assert!(RsiZone::new(2, 70.0, 30.0).is_ok());
    }

    #[test]
    fn warmup_emits_hold() {
        let strategy = RsiZone::new(5, 70.0, 30.0).unwrap();
        let signals = run_closes(strategy, &[100.0, 101.0, 102.0, 103.0, 104.0]);
        assert_eq!(signals.len(), 5);
        assert!(signals
            .iter()
            .all(|s| s.direction == Direction::Hold && s.strength == 0.0));
    }

    #[test]
    fn flat_then_declining_closes_compute_without_crossing() {
        // Five identical closes, then five declining: RSI starts at 100
        // (no losses) and falls, but the sequence must not panic and, with
        // wide zones, must not cross either threshold upward.
        let strategy = RsiZone::new(5, 99.0, 1.0).unwrap();
        let closes = [
            100.0, 100.0, 100.0, 100.0, 100.0, 99.0, 98.0, 97.0, 96.0, 95.0,
        ];
        let signals = run_closes(strategy, &closes);
        assert_eq!(signals.len(), closes.len());
        assert!(signals.iter().all(|s| s.direction != Direction::Sell));
    }

    #[test]
    fn all_gains_pin_rsi_at_100() {
        let strategy = RsiZone::new(3, 70.0, 30.0).unwrap();
        let closes = [100.0, 101.0, 102.0, 103.0];
        let signals = run_closes(strategy, &closes);
        // First full window: RSI = 100, strength = 1.0, no prior RSI → HOLD.
        let last = signals.last().unwrap();
        assert_eq!(last.direction, Direction::Hold);
        assert_eq!(last.strength, 1.0);
    }

    #[test]
    fn crossing_below_oversold_buys() {
        // Warm up flat (RSI 100), then collapse so RSI drops through the
        // oversold line in one step.
        let strategy = RsiZone::new(3, 70.0, 30.0).unwrap();
        let closes = [100.0, 100.5, 101.0, 101.5, 80.0, 60.0, 40.0];
        let signals = run_closes(strategy, &closes);
        assert!(
            signals.iter().any(|s| s.direction == Direction::Buy),
            "expected a BUY when RSI crossed below oversold"
        );
    }

    #[test]
    fn crossing_above_overbought_sells() {
        // Decline keeps RSI at 0, then a rally pushes it through overbought.
        let strategy = RsiZone::new(3, 70.0, 30.0).unwrap();
        let closes = [100.0, 99.0, 98.0, 97.0, 120.0, 140.0, 160.0];
        let signals = run_closes(strategy, &closes);
        assert!(
            signals.iter().any(|s| s.direction == Direction::Sell),
            "expected a SELL when RSI crossed above overbought"
        );
    }

    #[test]
    fn staying_inside_a_zone_does_not_refire() {
        // Once RSI is already below oversold, further weakness must not
        // produce another BUY (transition semantics, not level semantics).
        let strategy = RsiZone::new(3, 70.0, 30.0).unwrap();
        let closes = [100.0, 100.5, 101.0, 101.5, 80.0, 60.0, 40.0, 30.0, 20.0];
        let signals = run_closes(strategy, &closes);
        let buys = signals
            .iter()
            .filter(|s| s.direction == Direction::Buy)
            .count();
        assert_eq!(buys, 1);
    }
}
