//! Price grid construction and step location
//!
//! The grid is an immutable ladder of descending price levels anchored at the
//! price observed when the strategy (re)activates. Each step is sized against
//! the original anchor, not the previous level, so the ladder is a fixed
//! progression rather than a compounding one.

use serde::{Deserialize, Serialize};

/// Immutable ladder of strictly decreasing price levels.
///
/// Level 0 is the anchor price. A rebuild produces a whole new `Grid`; levels
/// are never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    levels: Vec<f64>,
}

impl Grid {
    /// Build a grid from an anchor price and a sequence of downward fractions.
    ///
    /// Produces `down_fractions.len() + 1` levels. Each level steps down by
    /// `anchor * fraction` from the previous one, keeping the step relative to
    /// the anchor. Building twice from identical inputs yields an identical
    /// grid.
    pub fn build(anchor: f64, down_fractions: &[f64]) -> Self {
        let mut levels = Vec::with_capacity(down_fractions.len() + 1);
        levels.push(anchor);

        let mut line = anchor;
        for fraction in down_fractions {
            line -= anchor * fraction;
            levels.push(line);
        }

        Grid { levels }
    }

    /// Number of levels in the ladder
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Index of the lowest level
    pub fn last_index(&self) -> usize {
        self.levels.len().saturating_sub(1)
    }

    /// Price at the given level
    pub fn level(&self, index: usize) -> f64 {
        self.levels[index]
    }

    /// All levels, highest first
    pub fn levels(&self) -> &[f64] {
        &self.levels
    }

    /// Count how many grid lines a falling price has crossed.
    ///
    /// Advances from `index` while the price sits at or below the next lower
    /// level, clamping at the lowest level rather than stepping past it.
    /// Returns the number of lines crossed and the updated index. Pure: no
    /// state is touched.
    pub fn step_down(&self, price: f64, mut index: usize) -> (usize, usize) {
        let mut steps = 0;
        while index < self.last_index() && price <= self.levels[index + 1] {
            index += 1;
            steps += 1;
        }
        (steps, index)
    }

    /// Walk the index back up as price rises above grid lines.
    ///
    /// Decrements while the price sits at or above the current level, but
    /// breaks early once the next higher line would already exceed the price,
    /// so a single large jump never moves the index up by more than one line
    /// past its resting position. Never reads below index 0.
    pub fn step_up(&self, price: f64, mut index: usize) -> usize {
        while index > 0 && price >= self.levels[index] {
            index -= 1;
            if index == 0 || price < self.levels[index - 1] {
                break;
            }
        }
        index
    }
}
