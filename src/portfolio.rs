//! Two-asset ledger with commission
//!
//! Tracks the quote-currency and base-asset balances of the simulated
//! account. Buys can fail on insufficient quote balance; sells always
//! succeed because the requested quantity is clamped to the held amount.

use tracing::debug;

/// Quote/base ledger for the simulated account.
///
/// Invariant: `base_balance >= 0` after every operation. Commission is
/// charged in base units on a buy and in quote units on a sell; the
/// asymmetry mirrors how the exchange settles each side.
#[derive(Debug, Clone)]
pub struct Portfolio {
    pub quote_balance: f64,
    pub base_balance: f64,
    commission_rate: f64,
    total_buys: usize,
    total_sells: usize,
}

impl Portfolio {
    pub fn new(initial_quote_balance: f64, commission_rate: f64) -> Self {
        Portfolio {
            quote_balance: initial_quote_balance,
            base_balance: 0.0,
            commission_rate,
            total_buys: 0,
            total_sells: 0,
        }
    }

    /// Buy `quantity` of the base asset at `price`.
    ///
    /// Rejected outright (no state change) when the cost exceeds the quote
    /// balance; there are no partial fills. Commission is deducted from the
    /// base amount received.
    pub fn buy(&mut self, price: f64, quantity: f64) -> bool {
        let cost = price * quantity;
        if cost > self.quote_balance {
            debug!(
                price,
                quantity,
                quote_balance = self.quote_balance,
                "buy rejected: insufficient quote balance"
            );
            return false;
        }

        let commission = quantity * self.commission_rate;
        self.base_balance += quantity - commission;
        self.quote_balance -= cost;
        self.total_buys += 1;
        debug!(price, quantity, commission, "buy filled");
        true
    }

    /// Sell `quantity` of the base asset at `price`.
    ///
    /// The quantity is clamped to the held base balance, so the call always
    /// succeeds and the base balance never goes negative. Commission is
    /// deducted from the quote proceeds.
    pub fn sell(&mut self, price: f64, quantity: f64) -> bool {
        let quantity = quantity.min(self.base_balance);
        let commission = quantity * price * self.commission_rate;
        self.base_balance -= quantity;
        self.quote_balance += quantity * price - commission;
        self.total_sells += 1;
        debug!(price, quantity, commission, "sell filled");
        true
    }

    /// Number of executed buys
    pub fn total_buys(&self) -> usize {
        self.total_buys
    }

    /// Number of executed sells
    pub fn total_sells(&self) -> usize {
        self.total_sells
    }
}
