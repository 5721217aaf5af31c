//! Market data feeds — synthetic random walk and CSV replay.
//!
//! Feeds only publish `MarketData` events onto the bus; they never drain
//! it. All bars go on the queue before the first dispatch, which is what
//! gives the pipeline its wave shape.

use std::path::PathBuf;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use tickflow_core::bus::EventBus;
use tickflow_core::events::{Event, MarketDataEvent};
use tickflow_core::num::round_dp;

/// First bar timestamp for synthetic data: 2024-01-02 09:30 UTC.
fn session_open() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 2, 9, 30, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("failed to open csv {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("csv {path} is missing required column \"{column}\"")]
    MissingColumn { path: PathBuf, column: String },

    #[error("row {row}: unparseable date {value:?}")]
    BadDate { row: usize, value: String },

    #[error("row {row}: unparseable number in column \"{column}\": {value:?}")]
    BadNumber {
        row: usize,
        column: String,
        value: String,
    },
}

/// Seeded random-walk OHLCV generator.
///
/// Closes walk from a base of 150.0 in uniform ±1.0 steps, floored at
/// 1.0. Bars are minute-spaced and rounded to 2 decimal places. The same
/// seed always produces the same bars.
pub struct SyntheticFeed {
    symbol: String,
    bars: usize,
    seed: u64,
}

const BASE_PRICE: f64 = 150.0;
const BASE_VOLUME: f64 = 1_000_000.0;

impl SyntheticFeed {
    pub fn new(symbol: impl Into<String>, bars: usize, seed: u64) -> Self {
        Self {
            symbol: symbol.into(),
            bars,
            seed,
        }
    }

    /// Generates the full bar sequence.
    pub fn bars(&self) -> Vec<MarketDataEvent> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let start = session_open();
        let mut close = BASE_PRICE;
        let mut out = Vec::with_capacity(self.bars);
        for i in 0..self.bars {
            let open = close;
            close = (close + rng.gen_range(-1.0..1.0)).max(1.0);
            let high = open.max(close) + rng.gen_range(0.0..0.5);
            let low = (open.min(close) - rng.gen_range(0.0..0.5)).max(0.5);
            let volume = (BASE_VOLUME * rng.gen_range(0.8..1.2)) as u64;
            out.push(MarketDataEvent {
                symbol: self.symbol.clone(),
                timestamp: start + Duration::minutes(i as i64),
                open: round_dp(open, 2),
                high: round_dp(high, 2),
                low: round_dp(low, 2),
                close: round_dp(close, 2),
                volume,
            });
        }
        out
    }

    /// Publishes every bar onto the bus without draining it.
    pub fn emit(&self, bus: &mut EventBus) -> usize {
        let bars = self.bars();
        let count = bars.len();
        for bar in bars {
            bus.publish(Event::MarketData(bar));
        }
        count
    }
}

/// Replays `date,open,high,low,close,volume` rows from a CSV file.
///
/// Headers are matched case-insensitively. Dates accept `2024-01-02`,
/// `2024-01-02 09:30:00`, and `01/02/2024`.
pub struct CsvFeed {
    symbol: String,
    path: PathBuf,
}

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

impl CsvFeed {
    pub fn new(symbol: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            symbol: symbol.into(),
            path: path.into(),
        }
    }

    pub fn load(&self) -> Result<Vec<MarketDataEvent>, FeedError> {
        let file = std::fs::File::open(&self.path).map_err(|source| FeedError::Io {
            path: self.path.clone(),
            source,
        })?;
        let mut reader = csv::Reader::from_reader(file);

        let headers = reader
            .headers()
            .map_err(|source| self.csv_err(source))?
            .clone();
        let column = |name: &str| -> Result<usize, FeedError> {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
                .ok_or_else(|| FeedError::MissingColumn {
                    path: self.path.clone(),
                    column: name.to_string(),
                })
        };
        let date_col = column("date")?;
        let open_col = column("open")?;
        let high_col = column("high")?;
        let low_col = column("low")?;
        let close_col = column("close")?;
        let volume_col = column("volume")?;

        let mut bars = Vec::new();
        for (row, record) in reader.records().enumerate() {
            let record = record.map_err(|source| self.csv_err(source))?;
            let field = |col: usize| record.get(col).unwrap_or("").trim();

            let timestamp = parse_date(field(date_col)).ok_or_else(|| FeedError::BadDate {
                row,
                value: field(date_col).to_string(),
            })?;
            let number = |name: &str, col: usize| -> Result<f64, FeedError> {
                field(col).parse().map_err(|_| FeedError::BadNumber {
                    row,
                    column: name.to_string(),
                    value: field(col).to_string(),
                })
            };

            bars.push(MarketDataEvent {
                symbol: self.symbol.clone(),
                timestamp,
                open: number("open", open_col)?,
                high: number("high", high_col)?,
                low: number("low", low_col)?,
                close: number("close", close_col)?,
                volume: number("volume", volume_col)? as u64,
            });
        }
        Ok(bars)
    }

    /// Publishes every row onto the bus without draining it.
    pub fn emit(&self, bus: &mut EventBus) -> Result<usize, FeedError> {
        let bars = self.load()?;
        let count = bars.len();
        for bar in bars {
            bus.publish(Event::MarketData(bar));
        }
        Ok(count)
    }

    fn csv_err(&self, source: csv::Error) -> FeedError {
        FeedError::Csv {
            path: self.path.clone(),
            source,
        }
    }
}

fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, DATETIME_FORMAT) {
        return Some(Utc.from_utc_datetime(&dt));
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return date
                .and_hms_opt(0, 0, 0)
                .map(|dt| Utc.from_utc_datetime(&dt));
        }
    }
    None
}
