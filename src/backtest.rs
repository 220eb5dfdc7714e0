//! Simulation engine
//!
//! Drives the grid strategy over a historical bar sequence: feeds the entry
//! gate, locates crossed grid lines, executes ladder buys, and unwinds the
//! open-order book as per-lot profit targets are reached. The run is a
//! strictly sequential fold over the candles; given the same configuration
//! and input it reproduces bit-for-bit.

use thiserror::Error;
use tracing::info;

use crate::config::StrategyConfig;
use crate::gate::EntryGate;
use crate::grid::Grid;
use crate::orders::OrderBook;
use crate::portfolio::Portfolio;
use crate::{Action, Candle, StrategyState, TradeRecord};

const HOURS_PER_YEAR: f64 = 24.0 * 365.0;
const SECONDS_PER_YEAR: f64 = HOURS_PER_YEAR * 3600.0;

/// Simulation failures surfaced to the caller
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("no candles supplied")]
    EmptyData,
}

/// Final account figures after a simulation run
#[derive(Debug, Clone)]
pub struct Summary {
    pub initial_quote_balance: f64,
    pub final_quote_balance: f64,
    pub final_base_balance: f64,
    /// Close of the last observed bar
    pub last_price: f64,
    /// Quote balance plus remaining base holdings marked at the last price
    pub total_value: f64,
    pub total_buys: usize,
    pub total_sells: usize,
    pub open_orders: usize,
    pub profit: f64,
    pub profit_pct: f64,
    /// Profit normalized by the elapsed span of the bar sequence
    pub annualized_profit_pct: f64,
}

/// Trade log and summary produced by a run
#[derive(Debug)]
pub struct SimulationResult {
    pub trades: Vec<TradeRecord>,
    pub summary: Summary,
}

/// Grid strategy simulator.
///
/// Owns all mutable run state: the active grid, the position index into it,
/// the ledger, the open-order book, and the idle/active state machine.
pub struct Backtester {
    strategy: StrategyConfig,
    gate: Box<dyn EntryGate>,
    portfolio: Portfolio,
    book: OrderBook,
    grid: Grid,
    index: usize,
    state: StrategyState,
    fixed_notional: f64,
}

impl Backtester {
    pub fn new(strategy: StrategyConfig) -> Self {
        let gate = strategy.entry_gate.build();
        let portfolio = Portfolio::new(strategy.initial_quote_balance, strategy.commission_rate);
        let grid = Grid::build(strategy.anchor_price, &strategy.down_fractions);
        let fixed_notional = strategy.fixed_notional();

        Backtester {
            strategy,
            gate,
            portfolio,
            book: OrderBook::new(),
            grid,
            index: 0,
            state: StrategyState::Idle,
            fixed_notional,
        }
    }

    /// Run the simulation over an ordered, fully materialized bar sequence.
    pub fn run(&mut self, candles: &[Candle]) -> Result<SimulationResult, SimulationError> {
        let first = candles.first().ok_or(SimulationError::EmptyData)?;
        let last = candles.last().ok_or(SimulationError::EmptyData)?;

        let mut trades = Vec::new();

        for candle in candles {
            self.process_bar(candle, &mut trades);
        }

        let summary = self.summarize(last.close, first, last, self.book.len());
        info!(
            trades = trades.len(),
            open_orders = summary.open_orders,
            "simulation done"
        );

        Ok(SimulationResult { trades, summary })
    }

    fn process_bar(&mut self, candle: &Candle, trades: &mut Vec<TradeRecord>) {
        let close = candle.close;
        self.gate.observe(close);

        // Re-entry check: only an idle strategy may re-anchor its grid.
        if self.state == StrategyState::Idle && self.gate.should_enter() {
            self.grid = Grid::build(close, &self.strategy.down_fractions);
            self.index = 0;
            self.state = StrategyState::Active;
            info!(
                timestamp = %candle.datetime,
                anchor = close,
                levels = ?self.grid.levels(),
                "new grid"
            );
        }

        // Ladder buy: the close fell through at least the next grid line.
        if self.index < self.grid.last_index() && close <= self.grid.level(self.index + 1) {
            let (steps, new_index) = self.grid.step_down(close, self.index);
            self.index = new_index;

            let quantity = self.fixed_notional * steps as f64 / close;
            if self.portfolio.buy(close, quantity) {
                self.book
                    .register_buy(close, quantity, self.strategy.up_fraction);
                trades.push(self.record(candle, Action::Buy, close));
                self.state = StrategyState::Active;
            }
        }

        // Keep the index consistent with a rising price even when no sell
        // fires. Only walk up once the close has reached the next higher
        // line; a fill at exactly the current level must not be undone on
        // the same tick. Guarded so index 0 never reads below the grid.
        if self.index > 0 && close >= self.grid.level(self.index - 1) {
            self.index = self.grid.step_up(close, self.index);
        }

        // Unwind every lot whose profit target this close has reached.
        for order in self.book.take_matured(close) {
            self.portfolio.sell(close, order.quantity);
            trades.push(self.record(candle, Action::Sell, close));
        }

        // Grid cycle complete: everything bought has been sold again.
        if self.book.is_empty() && self.portfolio.base_balance == 0.0 {
            self.state = StrategyState::Idle;
        }
    }

    fn record(&self, candle: &Candle, action: Action, price: f64) -> TradeRecord {
        TradeRecord {
            timestamp: candle.datetime,
            action,
            price,
            base_balance: self.portfolio.base_balance,
            quote_balance: self.portfolio.quote_balance,
        }
    }

    fn summarize(&self, last_price: f64, first: &Candle, last: &Candle, open_orders: usize) -> Summary {
        let initial = self.strategy.initial_quote_balance;
        let final_quote = self.portfolio.quote_balance;
        let final_base = self.portfolio.base_balance;

        let total_value = final_quote + final_base * last_price;
        let profit = total_value - initial;
        let profit_pct = profit / initial * 100.0;

        let elapsed_secs = (last.datetime - first.datetime).num_seconds() as f64;
        let years = elapsed_secs / SECONDS_PER_YEAR;
        let annualized_profit_pct = if years > 0.0 {
            profit / (years * initial) * 100.0
        } else {
            0.0
        };

        Summary {
            initial_quote_balance: initial,
            final_quote_balance: final_quote,
            final_base_balance: final_base,
            last_price,
            total_value,
            total_buys: self.portfolio.total_buys(),
            total_sells: self.portfolio.total_sells(),
            open_orders,
            profit,
            profit_pct,
            annualized_profit_pct,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EntryGateConfig;
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone, Utc};

    fn candles_from_closes(closes: &[f64]) -> Vec<Candle> {
        let start = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Candle {
                datetime: start + Duration::hours(i as i64),
                open: close,
                high: close * 1.001,
                low: close * 0.999,
                close,
                volume: 100.0,
            })
            .collect()
    }

    /// Gate that never fires, so the run trades only the initial grid.
    fn quiet_gate() -> EntryGateConfig {
        EntryGateConfig::Volatility {
            window: 10_000,
            threshold: 1.0,
        }
    }

    fn ladder_strategy() -> StrategyConfig {
        StrategyConfig {
            initial_quote_balance: 200.0,
            anchor_price: 20_000.0,
            down_fractions: vec![0.02, 0.02],
            up_fraction: 0.04,
            commission_rate: 0.0,
            entry_gate: quiet_gate(),
        }
    }

    #[test]
    fn empty_input_is_a_typed_error() {
        let mut backtester = Backtester::new(ladder_strategy());
        assert!(matches!(
            backtester.run(&[]),
            Err(SimulationError::EmptyData)
        ));
    }

    #[test]
    fn descending_closes_buy_one_lot_per_crossed_line() {
        let mut backtester = Backtester::new(ladder_strategy());
        let candles = candles_from_closes(&[20_000.0, 19_600.0, 19_200.0]);

        let result = backtester.run(&candles).unwrap();
        let buys: Vec<_> = result
            .trades
            .iter()
            .filter(|t| t.action == Action::Buy)
            .collect();

        assert_eq!(buys.len(), 2);
        assert_relative_eq!(buys[0].price, 19_600.0);
        assert_relative_eq!(buys[1].price, 19_200.0);

        // fixed_notional = 200 / 2 = 100 per level, both levels filled.
        assert_relative_eq!(result.summary.final_quote_balance, 0.0);
        assert!(result.summary.final_base_balance > 0.0);
        assert_eq!(result.summary.open_orders, 2);
    }

    #[test]
    fn one_bar_gap_down_buys_both_crossed_lines_at_once() {
        let mut backtester = Backtester::new(ladder_strategy());
        let candles = candles_from_closes(&[20_000.0, 19_200.0]);

        let result = backtester.run(&candles).unwrap();
        // A single two-line gap buys double notional in one fill.
        assert_eq!(result.summary.total_buys, 1);
        assert_relative_eq!(result.summary.final_quote_balance, 0.0);
        assert_relative_eq!(
            result.summary.final_base_balance,
            200.0 / 19_200.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn sell_fires_when_price_reaches_per_lot_target() {
        let mut backtester = Backtester::new(ladder_strategy());
        // Buy at 19600 (target 20384) and at 19200 (target 19968); the
        // 19968 close unwinds only the cheaper lot.
        let candles = candles_from_closes(&[20_000.0, 19_600.0, 19_200.0, 19_968.0]);

        let result = backtester.run(&candles).unwrap();
        let sells: Vec<_> = result
            .trades
            .iter()
            .filter(|t| t.action == Action::Sell)
            .collect();

        assert_eq!(result.summary.total_buys, 2);
        assert_eq!(sells.len(), 1);
        assert_relative_eq!(sells[0].price, 19_968.0);

        assert_eq!(result.summary.open_orders, 1);
        assert!(result.summary.final_base_balance > 0.0);
    }

    #[test]
    fn crossing_every_target_unwinds_the_whole_book() {
        let mut backtester = Backtester::new(ladder_strategy());
        // 20384 >= both targets (19968 and 20384): the full book matures in
        // one tick and the cycle closes back to idle.
        let candles = candles_from_closes(&[20_000.0, 19_600.0, 19_200.0, 20_384.0]);

        let result = backtester.run(&candles).unwrap();
        assert_eq!(result.summary.total_buys, 2);
        assert_eq!(result.summary.total_sells, 2);
        assert_eq!(result.summary.open_orders, 0);
        assert_relative_eq!(result.summary.final_base_balance, 0.0);

        // Sold above both buy prices with zero commission: a profit.
        assert!(result.summary.profit > 0.0);
    }

    #[test]
    fn gate_rebuilds_grid_at_current_close() {
        let strategy = StrategyConfig {
            // Anchor far below the data so the initial grid can never fill.
            anchor_price: 1_000.0,
            entry_gate: EntryGateConfig::Volatility {
                window: 2,
                threshold: 50.0,
            },
            ..ladder_strategy()
        };
        let mut backtester = Backtester::new(strategy);

        // Two calm closes fire the gate and re-anchor at 20000; the
        // following drop to 19600 crosses the first rebuilt line.
        let candles = candles_from_closes(&[20_010.0, 20_000.0, 19_600.0]);
        let result = backtester.run(&candles).unwrap();

        assert_eq!(result.summary.total_buys, 1);
        assert_relative_eq!(result.trades[0].price, 19_600.0);
    }

    #[test]
    fn buy_skipped_when_quote_balance_is_exhausted() {
        let mut backtester = Backtester::new(ladder_strategy());
        // The gap to 19200 fills both levels and drains the quote balance.
        // The bounce to 19700 walks the index back up without reaching any
        // sell target, so the re-descent attempts a buy that must be
        // rejected and leave no record.
        let candles = candles_from_closes(&[20_000.0, 19_200.0, 19_700.0, 19_200.0]);

        let result = backtester.run(&candles).unwrap();
        assert_eq!(result.summary.total_buys, 1);
        assert_eq!(result.summary.total_sells, 0);
        assert_eq!(result.trades.len(), 1);
        for trade in &result.trades {
            assert!(trade.quote_balance >= 0.0);
            assert!(trade.base_balance >= 0.0);
        }
    }

    #[test]
    fn summary_marks_remaining_base_to_market() {
        let mut backtester = Backtester::new(ladder_strategy());
        let candles = candles_from_closes(&[20_000.0, 19_600.0]);

        let result = backtester.run(&candles).unwrap();
        let summary = &result.summary;

        // One lot of 100/19600 bought; quote 100 left.
        assert_relative_eq!(summary.final_quote_balance, 100.0);
        assert_relative_eq!(
            summary.total_value,
            100.0 + (100.0 / 19_600.0) * 19_600.0,
            epsilon = 1e-9
        );
        assert_relative_eq!(summary.profit, 0.0, epsilon = 1e-9);
        assert_relative_eq!(summary.last_price, 19_600.0);
    }

    #[test]
    fn annualized_profit_uses_elapsed_span() {
        let mut backtester = Backtester::new(ladder_strategy());
        // 8760 hourly bars span one year within rounding; flat tape, no
        // trades, so annualized profit is exactly zero but well-defined.
        let closes = vec![20_000.0; 8761];
        let candles = candles_from_closes(&closes);

        let result = backtester.run(&candles).unwrap();
        assert_eq!(result.summary.total_buys, 0);
        assert_relative_eq!(result.summary.annualized_profit_pct, 0.0);
    }

    #[test]
    fn run_is_deterministic() {
        let candles = candles_from_closes(&[20_000.0, 19_600.0, 19_200.0, 19_968.0, 20_384.0]);

        let result_a = Backtester::new(ladder_strategy()).run(&candles).unwrap();
        let result_b = Backtester::new(ladder_strategy()).run(&candles).unwrap();

        assert_eq!(result_a.trades.len(), result_b.trades.len());
        assert_eq!(
            result_a.summary.final_quote_balance.to_bits(),
            result_b.summary.final_quote_balance.to_bits()
        );
        assert_eq!(
            result_a.summary.final_base_balance.to_bits(),
            result_b.summary.final_base_balance.to_bits()
        );
    }
}
