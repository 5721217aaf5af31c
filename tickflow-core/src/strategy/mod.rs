//! Signal strategies — interchangeable generators of `SignalEvent`s.
//!
//! Each strategy subscribes to `MarketData` and emits exactly one signal
//! per bar, keying all internal state by symbol. Selection goes through
//! [`build_strategy`], driven by a serializable [`StrategySpec`].

mod ma_crossover;
mod random_walk;
mod rsi;

pub use ma_crossover::MaCrossover;
pub use random_walk::RandomWalk;
pub use rsi::RsiZone;

use serde::{Deserialize, Serialize};

use crate::bus::SharedHandler;

/// Invalid strategy parameters, rejected at construction. Fatal, never
/// retried.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum StrategyError {
    #[error("fast ({fast}) must be less than slow ({slow})")]
    FastNotBelowSlow { fast: usize, slow: usize },

    #[error("period must be at least 2, got {0}")]
    PeriodTooShort(usize),

    #[error("oversold ({oversold}) must be less than overbought ({overbought})")]
    InvertedZones { oversold: f64, overbought: f64 },
}

/// Serializable strategy selector (tagged enum, one variant per strategy).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrategySpec {
    /// Simple moving average crossover of a fast and a slow window.
    MaCrossover {
        #[serde(default = "default_fast")]
        fast: usize,
        #[serde(default = "default_slow")]
        slow: usize,
    },

    /// RSI zone crossover into oversold/overbought territory.
    Rsi {
        #[serde(default = "default_period")]
        period: usize,
        #[serde(default = "default_overbought")]
        overbought: f64,
        #[serde(default = "default_oversold")]
        oversold: f64,
    },

    /// Uniform random direction and strength; the null-strategy baseline.
    Random,
}

fn default_fast() -> usize {
    5
}
fn default_slow() -> usize {
    20
}
fn default_period() -> usize {
    14
}
fn default_overbought() -> f64 {
    70.0
}
fn default_oversold() -> f64 {
    30.0
}

impl Default for StrategySpec {
    fn default() -> Self {
        StrategySpec::MaCrossover {
            fast: default_fast(),
            slow: default_slow(),
        }
    }
}

/// Build the strategy a spec describes.
///
/// `seed` is only consumed by the random strategy; the deterministic
/// strategies ignore it.
pub fn build_strategy(spec: &StrategySpec, seed: u64) -> Result<SharedHandler, StrategyError> {
    match *spec {
        StrategySpec::MaCrossover { fast, slow } => {
            Ok(crate::bus::shared(MaCrossover::new(fast, slow)?))
        }
        StrategySpec::Rsi {
            period,
            overbought,
            oversold,
        } => Ok(crate::bus::shared(RsiZone::new(period, overbought, oversold)?)),
        StrategySpec::Random => Ok(crate::bus::shared(RandomWalk::new(seed))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_defaults_fill_missing_fields() {
        let spec: StrategySpec = serde_json::from_str(r#"{"type": "ma_crossover"}"#).unwrap();
        assert_eq!(spec, StrategySpec::MaCrossover { fast: 5, slow: 20 });

        let spec: StrategySpec = serde_json::from_str(r#"{"type": "rsi", "period": 5}"#).unwrap();
        assert_eq!(
            spec,
            StrategySpec::Rsi {
                period: 5,
                overbought: 70.0,
                oversold: 30.0
            }
        );
    }

    #[test]
    fn factory_rejects_bad_parameters() {
        let bad = StrategySpec::MaCrossover { fast: 20, slow: 5 };
        assert!(matches!(
            build_strategy(&bad, 0),
            Err(StrategyError::FastNotBelowSlow { fast: 20, slow: 5 })
        ));

        let bad = StrategySpec::Rsi {
            period: 1,
            overbought: 70.0,
            oversold: 30.0,
        };
        assert!(matches!(
            build_strategy(&bad, 0),
            Err(StrategyError::PeriodTooShort(1))
        ));
    }

    #[test]
    fn factory_builds_every_variant() {
        assert!(build_strategy(&StrategySpec::default(), 0).is_ok());
        assert!(build_strategy(
            &StrategySpec::Rsi {
                period: 14,
                overbought: 70.0,
                oversold: 30.0
            },
            0
        )
        .is_ok());
        assert!(build_strategy(&StrategySpec::Random, 42).is_ok());
    }
}
