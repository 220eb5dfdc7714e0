//! Grid-Trading Strategy Simulator
//!
//! Simulates a grid-trading strategy against historical OHLCV data: buys
//! the base asset in fixed-notional increments as price descends through a
//! pre-computed ladder of levels, and sells accumulated lots as price rises
//! past per-lot profit targets, tracking a two-asset ledger net of
//! commission.

pub mod backtest;
pub mod config;
pub mod data;
pub mod gate;
pub mod grid;
pub mod orders;
pub mod portfolio;
pub mod report;
pub mod types;

pub use config::Config;
pub use types::*;
