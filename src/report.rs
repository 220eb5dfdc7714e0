//! Result sink
//!
//! Renders the trade log to CSV and the final summary to the console.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::backtest::Summary;
use crate::TradeRecord;

/// Write the trade log as CSV, one row per executed buy/sell, in
/// chronological order.
pub fn write_trade_log(trades: &[TradeRecord], path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref().to_path_buf();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).ok();
        }
    }

    let mut writer = csv::Writer::from_path(&path).context("Failed to create results file")?;
    for trade in trades {
        writer
            .serialize(trade)
            .context("Failed to write trade record")?;
    }
    writer.flush().context("Failed to flush results file")?;

    info!("Saved {} trades to {}", trades.len(), path.display());
    Ok(path)
}

/// Print the final summary block
pub fn print_summary(summary: &Summary) {
    println!("\n{}", "=".repeat(60));
    println!("SIMULATION RESULTS");
    println!("{}", "=".repeat(60));
    println!("Total buy orders:       {}", summary.total_buys);
    println!("Total sell orders:      {}", summary.total_sells);
    println!("Remaining open orders:  {}", summary.open_orders);
    println!(
        "Initial quote balance:  {:.2}",
        summary.initial_quote_balance
    );
    println!("Final quote balance:    {:.2}", summary.final_quote_balance);
    println!("Final base balance:     {:.6}", summary.final_base_balance);
    println!("Last observed price:    {:.2}", summary.last_price);
    println!("Mark-to-market value:   {:.2}", summary.total_value);
    println!("Absolute profit/loss:   {:.2}", summary.profit);
    println!("Percentage profit/loss: {:.2}%", summary.profit_pct);
    println!(
        "Annualized profit/loss: {:.2}% per year",
        summary.annualized_profit_pct
    );
    println!("{}", "=".repeat(60));
}
