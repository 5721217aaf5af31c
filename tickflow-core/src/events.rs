//! Typed events for the trading pipeline.
//!
//! Every pipeline stage communicates exclusively through these immutable
//! value records. The tagged [`Event`] enum is what travels on the bus;
//! [`EventKind`] is the discriminant the bus registry routes on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Trade direction carried by signals, orders, and fills.
///
/// `Hold` only ever appears on signals; the order stage drops it before
/// anything downstream can see it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Buy,
    Sell,
    Hold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    Market,
    Limit,
}

/// Order ID, unique for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub String);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fill ID, unique for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FillId(pub String);

impl fmt::Display for FillId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One OHLCV bar for a symbol at a timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketDataEvent {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Strategy output: a direction plus a strength in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalEvent {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub direction: Direction,
    pub strength: f64,
}

/// Order request produced from a non-HOLD signal.
///
/// `price` is the reference close the order stage last saw for the symbol,
/// or `0.0` if no bar has been observed yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderEvent {
    pub order_id: OrderId,
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub order_type: OrderType,
    pub direction: Direction,
    pub quantity: u32,
    pub price: f64,
}

/// Order that passed every risk check, fields unchanged from the original.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovedOrderEvent {
    pub order_id: OrderId,
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub order_type: OrderType,
    pub direction: Direction,
    pub quantity: u32,
    pub price: f64,
}

/// Order rejected by the risk stage. A veto is a normal protocol outcome,
/// not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskVetoEvent {
    pub order_id: OrderId,
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub reason: String,
}

/// Simulated execution of an approved order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillEvent {
    pub fill_id: FillId,
    pub order_id: OrderId,
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub direction: Direction,
    pub quantity: u32,
    pub fill_price: f64,
    pub commission: f64,
}

/// Snapshot of the portfolio for one symbol, published after every fill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioUpdateEvent {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    /// Signed shares held (positive = long).
    pub position: i64,
    /// Weighted-average cost basis per share; 0 when flat.
    pub avg_cost: f64,
    pub realized_pnl: f64,
    pub unrealized_pnl: f64,
    pub cash: f64,
    /// Cash plus mark-to-market value of all open positions.
    pub equity: f64,
}

/// Tagged union of every event kind that can travel on the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    MarketData(MarketDataEvent),
    Signal(SignalEvent),
    Order(OrderEvent),
    ApprovedOrder(ApprovedOrderEvent),
    RiskVeto(RiskVetoEvent),
    Fill(FillEvent),
    PortfolioUpdate(PortfolioUpdateEvent),
}

/// Discriminant used by the bus registry for exact-kind routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    MarketData,
    Signal,
    Order,
    ApprovedOrder,
    RiskVeto,
    Fill,
    PortfolioUpdate,
}

impl EventKind {
    /// All kinds, in pipeline order. Observers that want everything
    /// subscribe to this list.
    pub const ALL: [EventKind; 7] = [
        EventKind::MarketData,
        EventKind::Signal,
        EventKind::Order,
        EventKind::ApprovedOrder,
        EventKind::RiskVeto,
        EventKind::Fill,
        EventKind::PortfolioUpdate,
    ];
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventKind::MarketData => "market_data",
            EventKind::Signal => "signal",
            EventKind::Order => "order",
            EventKind::ApprovedOrder => "approved_order",
            EventKind::RiskVeto => "risk_veto",
            EventKind::Fill => "fill",
            EventKind::PortfolioUpdate => "portfolio_update",
        };
        write!(f, "{name}")
    }
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::MarketData(_) => EventKind::MarketData,
            Event::Signal(_) => EventKind::Signal,
            Event::Order(_) => EventKind::Order,
            Event::ApprovedOrder(_) => EventKind::ApprovedOrder,
            Event::RiskVeto(_) => EventKind::RiskVeto,
            Event::Fill(_) => EventKind::Fill,
            Event::PortfolioUpdate(_) => EventKind::PortfolioUpdate,
        }
    }

    pub fn symbol(&self) -> &str {
        match self {
            Event::MarketData(e) => &e.symbol,
            Event::Signal(e) => &e.symbol,
            Event::Order(e) => &e.symbol,
            Event::ApprovedOrder(e) => &e.symbol,
            Event::RiskVeto(e) => &e.symbol,
            Event::Fill(e) => &e.symbol,
            Event::PortfolioUpdate(e) => &e.symbol,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Event::MarketData(e) => e.timestamp,
            Event::Signal(e) => e.timestamp,
            Event::Order(e) => e.timestamp,
            Event::ApprovedOrder(e) => e.timestamp,
            Event::RiskVeto(e) => e.timestamp,
            Event::Fill(e) => e.timestamp,
            Event::PortfolioUpdate(e) => e.timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_bar() -> MarketDataEvent {
        MarketDataEvent {
            symbol: "AAPL".into(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 9, 30, 0).unwrap(),
            open: 150.0,
            high: 151.2,
            low: 149.5,
            close: 150.8,
            volume: 1_000_000,
        }
    }

    #[test]
    fn kind_matches_variant() {
        assert_eq!(Event::MarketData(sample_bar()).kind(), EventKind::MarketData);
        let veto = RiskVetoEvent {
            order_id: OrderId("ord-1".into()),
            symbol: "AAPL".into(),
            timestamp: sample_bar().timestamp,
            reason: "test".into(),
        };
        assert_eq!(Event::RiskVeto(veto).kind(), EventKind::RiskVeto);
    }

    #[test]
    fn events_compare_by_value() {
        assert_eq!(Event::MarketData(sample_bar()), Event::MarketData(sample_bar()));
        let mut other = sample_bar();
        other.close = 151.0;
        assert_ne!(Event::MarketData(sample_bar()), Event::MarketData(other));
    }

    #[test]
    fn serialization_roundtrip() {
        let event = Event::MarketData(sample_bar());
        let json = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(event, back);
    }

    #[test]
    fn accessors_cover_every_variant() {
        let bar = sample_bar();
        let ts = bar.timestamp;
        let signal = Event::Signal(SignalEvent {
            symbol: "AAPL".into(),
            timestamp: ts,
            direction: Direction::Hold,
            strength: 0.0,
        });
        assert_eq!(signal.symbol(), "AAPL");
        assert_eq!(signal.timestamp(), ts);
    }
}
