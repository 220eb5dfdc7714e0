//! Configuration management
//!
//! Handles loading and validation of JSON configuration files. A run is a
//! pure function of this configuration plus the input bar sequence; nothing
//! is fetched or persisted as a side effect of loading it.

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::gate::{EntryGate, MomentumDirection, MomentumGate, VolatilityGate};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub market: MarketConfig,
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).context("Failed to read config file")?;
        let config: Config =
            serde_json::from_str(&contents).context("Failed to parse config JSON")?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration describes a runnable simulation
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.market.symbol.is_empty(), "symbol must not be empty");
        ensure!(self.market.bar_count > 0, "bar_count must be positive");

        let s = &self.strategy;
        ensure!(
            s.initial_quote_balance > 0.0,
            "initial_quote_balance must be positive"
        );
        ensure!(s.anchor_price > 0.0, "anchor_price must be positive");
        ensure!(
            !s.down_fractions.is_empty(),
            "down_fractions must not be empty"
        );
        ensure!(
            s.down_fractions.iter().all(|f| *f > 0.0),
            "down_fractions must all be positive"
        );
        ensure!(s.up_fraction > 0.0, "up_fraction must be positive");
        ensure!(
            (0.0..1.0).contains(&s.commission_rate),
            "commission_rate must be in [0, 1)"
        );

        if let EntryGateConfig::Volatility { window, threshold } = &s.entry_gate {
            ensure!(*window > 0, "volatility window must be positive");
            ensure!(*threshold > 0.0, "volatility threshold must be positive");
        }

        Ok(())
    }
}

/// Which market data to simulate against
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Exchange symbol, e.g. "BTCUSDT"
    pub symbol: String,
    /// Candle interval, e.g. "1h"
    pub timeframe: String,
    /// Number of candles to load
    pub bar_count: u32,
    /// First candle date (YYYY-MM-DD)
    pub start_date: String,
}

impl Default for MarketConfig {
    fn default() -> Self {
        MarketConfig {
            symbol: "BTCUSDT".to_string(),
            timeframe: "1h".to_string(),
            bar_count: 24 * 30 * 14,
            start_date: "2022-07-01".to_string(),
        }
    }
}

/// Strategy parameters consumed by the simulation core
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Starting quote-currency balance; also the total strategy capital
    pub initial_quote_balance: f64,
    /// Anchor price of the initial grid, before any gate signal
    pub anchor_price: f64,
    /// Downward step fractions, each relative to the grid anchor
    pub down_fractions: Vec<f64>,
    /// Per-lot profit target as a fraction above the buy price
    pub up_fraction: f64,
    /// Proportional fee charged on every fill
    pub commission_rate: f64,
    pub entry_gate: EntryGateConfig,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        StrategyConfig {
            initial_quote_balance: 15_000.0,
            anchor_price: 26_700.0,
            down_fractions: vec![
                0.02, 0.02, 0.02, 0.02, 0.02, //
                0.04, 0.04, 0.04, 0.04, 0.04, //
                0.06, 0.06, 0.06, 0.06, 0.06,
            ],
            up_fraction: 0.04,
            commission_rate: 0.001,
            entry_gate: EntryGateConfig::default(),
        }
    }
}

impl StrategyConfig {
    /// Quote amount allocated per grid level
    pub fn fixed_notional(&self) -> f64 {
        self.initial_quote_balance / self.down_fractions.len() as f64
    }
}

/// Entry gate policy selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum EntryGateConfig {
    /// Re-activate in low-volatility conditions
    Volatility { window: usize, threshold: f64 },
    /// Re-activate when the close diverges from its 3-bar mean
    Momentum { direction: MomentumDirection },
}

impl Default for EntryGateConfig {
    fn default() -> Self {
        EntryGateConfig::Volatility {
            window: 20,
            threshold: 150.0,
        }
    }
}

impl EntryGateConfig {
    /// Build the configured gate
    pub fn build(&self) -> Box<dyn EntryGate> {
        match *self {
            EntryGateConfig::Volatility { window, threshold } => {
                Box::new(VolatilityGate::new(window, threshold))
            }
            EntryGateConfig::Momentum { direction } => Box::new(MomentumGate::new(direction)),
        }
    }
}

/// Where results land
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Trade-log CSV path
    pub results_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            results_path: "strategy_results.csv".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> Config {
        Config {
            market: MarketConfig::default(),
            strategy: StrategyConfig::default(),
            output: OutputConfig::default(),
        }
    }

    #[test]
    fn default_config_is_valid() {
        assert!(sample_config().validate().is_ok());
    }

    #[test]
    fn fixed_notional_divides_capital_by_level_count() {
        let strategy = StrategyConfig::default();
        assert_eq!(strategy.fixed_notional(), 15_000.0 / 15.0);
    }

    #[test]
    fn rejects_commission_of_one_or_more() {
        let mut config = sample_config();
        config.strategy.commission_rate = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_non_positive_fractions() {
        let mut config = sample_config();
        config.strategy.down_fractions = vec![0.02, -0.02];
        assert!(config.validate().is_err());

        config.strategy.down_fractions = vec![];
        assert!(config.validate().is_err());
    }

    #[test]
    fn parses_momentum_gate_from_json() {
        let json = r#"{
            "market": {
                "symbol": "BTCUSDT",
                "timeframe": "1h",
                "bar_count": 500,
                "start_date": "2023-01-01"
            },
            "strategy": {
                "initial_quote_balance": 1000.0,
                "anchor_price": 20000.0,
                "down_fractions": [0.02, 0.02],
                "up_fraction": 0.04,
                "commission_rate": 0.001,
                "entry_gate": { "policy": "momentum", "direction": "mean_above_close" }
            }
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
        assert!(matches!(
            config.strategy.entry_gate,
            EntryGateConfig::Momentum {
                direction: MomentumDirection::MeanAboveClose
            }
        ));
        assert_eq!(config.output.results_path, "strategy_results.csv");
    }

    #[test]
    fn parses_volatility_gate_from_json() {
        let json = r#"{ "policy": "volatility", "window": 24, "threshold": 120.5 }"#;
        let gate: EntryGateConfig = serde_json::from_str(json).unwrap();
        assert!(matches!(
            gate,
            EntryGateConfig::Volatility { window: 24, .. }
        ));
    }
}
