//! Backtest command implementation: simulate against a local CSV file

use anyhow::{Context, Result};
use grid_backtest::backtest::Backtester;
use grid_backtest::data;
use grid_backtest::{report, Config};
use tracing::info;

pub fn run(config_path: String, data_path: String) -> Result<()> {
    info!("Starting backtest");

    let config = Config::from_file(&config_path)?;
    info!("Loaded configuration from: {}", config_path);

    let candles = data::load_csv(&data_path)
        .context(format!("Failed to load data from {}", data_path))?;
    info!("Loaded {} candles from {}", candles.len(), data_path);

    let validation = data::validate_candles(&candles);
    for warning in &validation.warnings {
        tracing::warn!("{}", warning);
    }
    if !validation.is_valid() {
        anyhow::bail!("Input data failed validation: {:?}", validation.errors);
    }

    let mut backtester = Backtester::new(config.strategy.clone());
    let result = backtester.run(&candles)?;

    report::write_trade_log(&result.trades, &config.output.results_path)?;
    report::print_summary(&result.summary);

    info!("Backtest completed successfully");
    Ok(())
}
