//! Run command implementation: fetch history, then simulate

use anyhow::{Context, Result};
use grid_backtest::backtest::Backtester;
use grid_backtest::data::{self, BinanceDataFetcher};
use grid_backtest::{report, Config};
use tracing::info;

pub fn run(config_path: String) -> Result<()> {
    info!("Starting simulation run");

    let config = Config::from_file(&config_path)?;
    info!("Loaded configuration from: {}", config_path);

    let market = &config.market;
    let start_time = data::timestamp_from_date(&market.start_date)?;

    let fetcher = BinanceDataFetcher::new();
    let candles = fetcher
        .fetch_history(
            &market.symbol,
            &market.timeframe,
            start_time,
            market.bar_count,
        )
        .context("Historical data fetch failed")?;

    let validation = data::validate_candles(&candles);
    for warning in &validation.warnings {
        tracing::warn!("{}", warning);
    }
    if !validation.is_valid() {
        anyhow::bail!("Fetched data failed validation: {:?}", validation.errors);
    }

    info!("Simulating over {} candles", candles.len());
    let mut backtester = Backtester::new(config.strategy.clone());
    let result = backtester.run(&candles)?;

    report::write_trade_log(&result.trades, &config.output.results_path)?;
    report::print_summary(&result.summary);

    info!("Run completed successfully");
    Ok(())
}
