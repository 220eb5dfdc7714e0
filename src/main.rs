//! Grid-trading simulator - main entry point
//!
//! This binary provides three subcommands:
//! - run: Fetch historical data and simulate the strategy
//! - backtest: Simulate the strategy against a local CSV file
//! - download: Download historical data from Binance

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "grid-backtest")]
#[command(about = "Grid-trading strategy simulator with historical data download", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch historical data and run the simulation
    Run {
        /// Path to configuration file
        #[arg(short, long, default_value = "configs/btc_usdt_1h.json")]
        config: String,
    },

    /// Run the simulation against a local CSV file
    Backtest {
        /// Path to configuration file
        #[arg(short, long, default_value = "configs/btc_usdt_1h.json")]
        config: String,

        /// Path to OHLCV CSV file
        #[arg(short, long)]
        data: String,
    },

    /// Download historical data from Binance
    Download {
        /// Trading symbol, e.g. "BTCUSDT"
        #[arg(short, long, default_value = "BTCUSDT")]
        symbol: String,

        /// Timeframe interval, e.g. "1h", "4h", "1d"
        #[arg(short, long, default_value = "1h")]
        interval: String,

        /// First candle date (YYYY-MM-DD)
        #[arg(long, default_value = "2022-07-01")]
        start: String,

        /// Number of candles to fetch
        #[arg(short, long, default_value = "10080")]
        bars: u32,

        /// Output CSV path
        #[arg(short, long, default_value = "data/BTCUSDT_1h.csv")]
        output: String,
    },
}

fn setup_logging(verbose: bool, command_name: &str) -> Result<()> {
    // Create logs directory
    std::fs::create_dir_all("logs")?;

    // Create log file with naming pattern: {command}_{date}.log
    let log_filename = format!(
        "{}_{}.log",
        command_name,
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
    );
    let log_path = PathBuf::from("logs").join(&log_filename);

    // Set log level - filter out noisy external crates
    let level = if verbose { "debug" } else { "info" };
    let filter_str = format!(
        "{},hyper=warn,hyper_util=warn,reqwest=warn,rustls=warn,h2=warn",
        level
    );
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    // File appender
    let file_appender = tracing_appender::rolling::never("logs", &log_filename);

    // Console layer
    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(true);

    // File layer - same format but without ANSI colors
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_appender)
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    info!("Logging initialized");
    info!("Log file: {}", log_path.display());

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let command_name = match &cli.command {
        Commands::Run { .. } => "run",
        Commands::Backtest { .. } => "backtest",
        Commands::Download { .. } => "download",
    };

    setup_logging(cli.verbose, command_name)?;

    match cli.command {
        Commands::Run { config } => commands::run::run(config),

        Commands::Backtest { config, data } => commands::backtest::run(config, data),

        Commands::Download {
            symbol,
            interval,
            start,
            bars,
            output,
        } => commands::download::run(symbol, interval, start, bars, output),
    }
}
