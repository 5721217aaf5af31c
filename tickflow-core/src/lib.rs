//! TickFlow Core — event-driven trading simulation pipeline.
//!
//! A single-threaded FIFO bus dispatches typed events through a fixed
//! chain of stages:
//!
//! ```text
//! MarketData → Signal → Order → ApprovedOrder/RiskVeto → Fill → PortfolioUpdate
//! ```
//!
//! Stages communicate only through published events; no stage calls
//! another directly. Dispatch happens in breadth-first waves (see
//! [`bus`]), which every downstream stage implicitly relies on. The run
//! is fully deterministic given fixed seeds and a fixed publish order.

pub mod bus;
pub mod events;
pub mod execution;
pub mod metrics;
pub mod num;
pub mod order;
pub mod portfolio;
pub mod risk;
pub mod strategy;
