//! Entry gate policies
//!
//! The gate decides when an idle strategy should (re)activate and rebuild
//! its grid at the current price. Two interchangeable policies exist: a
//! volatility gate that waits for range-bound conditions, and a momentum
//! gate that reacts to the close diverging from a short rolling mean.

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::VecDeque;

/// Window length of the momentum gate's rolling mean
const MOMENTUM_WINDOW: usize = 3;

/// Policy deciding when the strategy transitions from idle to active.
///
/// `observe` is fed every closing price in order; `should_enter` is only
/// consulted while the strategy is idle.
pub trait EntryGate: Send + Sync {
    /// Record a closing price
    fn observe(&mut self, close: f64);

    /// Whether the strategy should activate and rebuild its grid now
    fn should_enter(&self) -> bool;
}

/// Activates in low-volatility, range-bound conditions.
///
/// Keeps the full history of observed closes and, once at least `window`
/// are available, signals when the population standard deviation of the
/// most recent `window` closes drops below the threshold.
pub struct VolatilityGate {
    history: Vec<f64>,
    window: usize,
    threshold: f64,
}

impl VolatilityGate {
    pub fn new(window: usize, threshold: f64) -> Self {
        VolatilityGate {
            history: Vec::new(),
            window,
            threshold,
        }
    }
}

impl EntryGate for VolatilityGate {
    fn observe(&mut self, close: f64) {
        self.history.push(close);
    }

    fn should_enter(&self) -> bool {
        if self.history.len() < self.window {
            return false;
        }

        let start = self.history.len() - self.window;
        let std_dev = self.history[start..].iter().population_std_dev();

        if std_dev < self.threshold {
            tracing::info!(std_dev, threshold = self.threshold, "low volatility entry signal");
            return true;
        }
        false
    }
}

/// Which side of the rolling mean triggers a momentum entry.
///
/// The original strategy notebooks disagreed on the direction, so it is an
/// explicit configuration choice rather than a baked-in default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MomentumDirection {
    /// Enter when the rolling mean sits above the current close (price
    /// dipped below its recent average)
    MeanAboveClose,
    /// Enter when the rolling mean sits below the current close (price
    /// pushed above its recent average)
    MeanBelowClose,
}

/// Activates when the close diverges from the mean of the last three
/// closes in the configured direction.
pub struct MomentumGate {
    window: VecDeque<f64>,
    direction: MomentumDirection,
}

impl MomentumGate {
    pub fn new(direction: MomentumDirection) -> Self {
        MomentumGate {
            window: VecDeque::with_capacity(MOMENTUM_WINDOW),
            direction,
        }
    }
}

impl EntryGate for MomentumGate {
    fn observe(&mut self, close: f64) {
        if self.window.len() == MOMENTUM_WINDOW {
            self.window.pop_front();
        }
        self.window.push_back(close);
    }

    fn should_enter(&self) -> bool {
        if self.window.len() < MOMENTUM_WINDOW {
            return false;
        }

        let mean = self.window.iter().sum::<f64>() / self.window.len() as f64;
        // The newest observation is the current close.
        let close = *self.window.back().expect("window is full");

        let signal = match self.direction {
            MomentumDirection::MeanAboveClose => mean > close,
            MomentumDirection::MeanBelowClose => mean < close,
        };
        if signal {
            tracing::info!(mean, close, direction = ?self.direction, "momentum entry signal");
        }
        signal
    }
}
