//! Data loading and management
//!
//! Handles loading OHLCV data from CSV files and historical data fetching
//! from the Binance public klines API. Fetching is an explicit step that
//! completes before any simulation begins; the core only ever sees a fully
//! materialized, ascending bar sequence.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use itertools::Itertools;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread::sleep;
use std::time::Duration as StdDuration;
use tracing::{info, warn};

use crate::Candle;

// =============================================================================
// Constants
// =============================================================================

const BINANCE_KLINES_URL: &str = "https://api.binance.com/api/v3/klines";
const REQUEST_DELAY_MS: u64 = 500;

/// Maximum candles per klines request
pub const PAGE_SIZE: u32 = 1000;

/// Valid intervals for Binance klines
pub const INTERVALS: &[&str] = &[
    "1m", "5m", "15m", "30m", "1h", "2h", "4h", "6h", "8h", "12h", "1d", "3d", "1w", "1M",
];

// =============================================================================
// CSV Data Loading
// =============================================================================

/// Load OHLCV data from CSV file
pub fn load_csv(path: impl AsRef<Path>) -> Result<Vec<Candle>> {
    let mut reader = csv::Reader::from_path(path.as_ref()).context("Failed to open CSV file")?;

    let mut candles = Vec::new();

    for (row_idx, result) in reader.records().enumerate() {
        let record = result.context(format!("Failed to read row {}", row_idx + 1))?;

        let dt_str = record.get(0).context("Missing datetime column")?;
        let datetime = dt_str
            .parse::<DateTime<Utc>>()
            .or_else(|_| {
                // Try parsing without timezone and assume UTC
                chrono::NaiveDateTime::parse_from_str(dt_str, "%Y-%m-%d %H:%M:%S")
                    .map(|ndt| DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc))
            })
            .context(format!("Failed to parse datetime: {}", dt_str))?;

        let open: f64 = record
            .get(1)
            .context("Missing open column")?
            .parse()
            .context("Failed to parse open")?;
        let high: f64 = record
            .get(2)
            .context("Missing high column")?
            .parse()
            .context("Failed to parse high")?;
        let low: f64 = record
            .get(3)
            .context("Missing low column")?
            .parse()
            .context("Failed to parse low")?;
        let close: f64 = record
            .get(4)
            .context("Missing close column")?
            .parse()
            .context("Failed to parse close")?;
        let volume: f64 = record
            .get(5)
            .context("Missing volume column")?
            .parse()
            .context("Failed to parse volume")?;

        candles.push(Candle {
            datetime,
            open,
            high,
            low,
            close,
            volume,
        });
    }

    Ok(candles)
}

/// Save candles to CSV file
pub fn save_to_csv(candles: &[Candle], path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref().to_path_buf();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).ok();
        }
    }

    let mut file = File::create(&path).context("Failed to create output file")?;

    writeln!(file, "datetime,open,high,low,close,volume")?;
    for candle in candles {
        writeln!(
            file,
            "{},{},{},{},{},{}",
            candle.datetime.format("%Y-%m-%d %H:%M:%S"),
            candle.open,
            candle.high,
            candle.low,
            candle.close,
            candle.volume
        )?;
    }

    info!("Saved {} rows to {}", candles.len(), path.display());
    Ok(path)
}

/// Parse a YYYY-MM-DD date into a UTC timestamp in milliseconds
pub fn timestamp_from_date(date_str: &str) -> Result<i64> {
    let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .context(format!("Failed to parse date: {}", date_str))?;
    let datetime = date
        .and_hms_opt(0, 0, 0)
        .context("Invalid midnight timestamp")?;
    Ok(DateTime::<Utc>::from_naive_utc_and_offset(datetime, Utc).timestamp_millis())
}

// =============================================================================
// Binance Data Fetcher
// =============================================================================

/// Fetch historical OHLCV data from the Binance public klines endpoint
pub struct BinanceDataFetcher {
    client: reqwest::blocking::Client,
    request_delay: StdDuration,
}

impl Default for BinanceDataFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl BinanceDataFetcher {
    /// Create a new data fetcher
    pub fn new() -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(StdDuration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            request_delay: StdDuration::from_millis(REQUEST_DELAY_MS),
        }
    }

    /// Fetch a single page of candles, capped at [`PAGE_SIZE`]
    pub fn fetch_klines(
        &self,
        symbol: &str,
        interval: &str,
        start_time: i64,
        limit: u32,
    ) -> Result<Vec<Candle>> {
        let url = format!(
            "{}?symbol={}&interval={}&startTime={}&limit={}",
            BINANCE_KLINES_URL,
            symbol,
            interval,
            start_time,
            limit.min(PAGE_SIZE)
        );

        let response = self.client.get(&url).send().context("Failed to send request")?;

        if !response.status().is_success() {
            anyhow::bail!("API returned status: {}", response.status());
        }

        let rows: Vec<Vec<serde_json::Value>> =
            response.json().context("Failed to parse response")?;

        rows.iter().map(|row| parse_kline(row)).collect()
    }

    /// Fetch `bar_count` candles starting at `start_time`, paginating
    /// forward in chunks of [`PAGE_SIZE`].
    ///
    /// Pages resume one millisecond after the last received open time, so
    /// chunk boundaries produce no duplicate and no missing bars. The result
    /// is sorted ascending and deduplicated defensively before return.
    pub fn fetch_history(
        &self,
        symbol: &str,
        interval: &str,
        start_time: i64,
        bar_count: u32,
    ) -> Result<Vec<Candle>> {
        info!(
            "Fetching {} {} candles for {} from {}",
            bar_count, interval, symbol, start_time
        );

        let mut all_candles: Vec<Candle> = Vec::with_capacity(bar_count as usize);
        let mut since = start_time;
        let mut remaining = bar_count;

        while remaining > 0 {
            let limit = remaining.min(PAGE_SIZE);
            let candles = self.fetch_klines(symbol, interval, since, limit)?;

            if candles.is_empty() {
                warn!("No more data available after {}", since);
                break;
            }

            let newest = candles
                .last()
                .map(|c| c.datetime.timestamp_millis())
                .unwrap_or(since);

            info!(
                "  Fetched {} candles, newest: {}",
                candles.len(),
                candles.last().map(|c| c.datetime.to_rfc3339()).unwrap_or_default()
            );

            remaining = remaining.saturating_sub(candles.len() as u32);
            all_candles.extend(candles);

            // Next page begins strictly after the last open time.
            since = newest + 1;

            // Rate limiting
            if remaining > 0 {
                sleep(self.request_delay);
            }
        }

        if all_candles.is_empty() {
            anyhow::bail!("No data fetched for {}", symbol);
        }

        // Sort by time (oldest first) and deduplicate
        all_candles.sort_by_key(|c| c.datetime);
        all_candles.dedup_by_key(|c| c.datetime);
        all_candles.truncate(bar_count as usize);

        info!("Total candles fetched: {}", all_candles.len());

        Ok(all_candles)
    }
}

/// Parse one klines response row
///
/// Rows are heterogeneous arrays: `[open_time, "open", "high", "low",
/// "close", "volume", close_time, ...]` with prices as strings.
fn parse_kline(row: &[serde_json::Value]) -> Result<Candle> {
    let open_time = row
        .first()
        .and_then(|v| v.as_i64())
        .context("Missing kline open time")?;
    let datetime =
        DateTime::from_timestamp_millis(open_time).context("Invalid kline open time")?;

    let field = |idx: usize, name: &str| -> Result<f64> {
        row.get(idx)
            .and_then(|v| v.as_str())
            .context(format!("Missing kline {} field", name))?
            .parse::<f64>()
            .context(format!("Failed to parse kline {}", name))
    };

    Ok(Candle {
        datetime,
        open: field(1, "open")?,
        high: field(2, "high")?,
        low: field(3, "low")?,
        close: field(4, "close")?,
        volume: field(5, "volume")?,
    })
}

// =============================================================================
// Data Validation
// =============================================================================

/// Validate candle data for consistency
pub fn validate_candles(candles: &[Candle]) -> ValidationResult {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if candles.is_empty() {
        errors.push("No candles provided".to_string());
        return ValidationResult { errors, warnings };
    }

    for (i, candle) in candles.iter().enumerate() {
        if let Err(err) = candle.validate() {
            errors.push(format!("Candle {}: {}", i, err));
        }
    }

    for ((i, previous), (_, current)) in candles.iter().enumerate().tuple_windows() {
        if current.datetime <= previous.datetime {
            warnings.push(format!("Candle {}: not chronological", i + 1));
        }
    }

    ValidationResult { errors, warnings }
}

/// Result of data validation
#[derive(Debug)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================
