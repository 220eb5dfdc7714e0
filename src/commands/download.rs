//! Download command implementation

use anyhow::Result;
use grid_backtest::data::{self, BinanceDataFetcher, INTERVALS};
use tracing::info;

pub fn run(symbol: String, interval: String, start: String, bars: u32, output: String) -> Result<()> {
    if !INTERVALS.contains(&interval.as_str()) {
        anyhow::bail!(
            "Invalid interval: {}. Valid intervals: {}",
            interval,
            INTERVALS.join(", ")
        );
    }

    let start_time = data::timestamp_from_date(&start)?;

    info!("Downloading {} {} candles for {}", bars, interval, symbol);
    let fetcher = BinanceDataFetcher::new();
    let candles = fetcher.fetch_history(&symbol, &interval, start_time, bars)?;

    let path = data::save_to_csv(&candles, &output)?;
    info!("Download complete: {}", path.display());

    Ok(())
}
