//! CLI command implementations

pub mod backtest;
pub mod download;
pub mod run;
