//! Date-keyed margin balances.
//!
//! A balance only moves on trade admission and on the terminal date; every
//! other date inherits the previous one.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::{Position, Side};

/// A commitment that did not fit in the available margin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarginShortfall {
    pub required: f64,
    pub available: f64,
}

/// Margin a position ties up: its entry notional, scaled by `short_haircut`
/// for short positions.
pub fn required_commitment(position: &Position, short_haircut: f64) -> f64 {
    match position.side() {
        Side::Long => position.initial_notional(),
        Side::Short => position.initial_notional() * short_haircut,
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarginLedger {
    balances: BTreeMap<NaiveDate, f64>,
}

impl MarginLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&mut self, date: NaiveDate, amount: f64) {
        self.balances.insert(date, amount);
    }

    /// Copy the balance of `from` onto `to`.
    pub fn carry_forward(&mut self, from: NaiveDate, to: NaiveDate) {
        let balance = self.balance(from);
        self.balances.insert(to, balance);
    }

    /// Balance on `date`; 0 for dates the ledger has never seen.
    pub fn balance(&self, date: NaiveDate) -> f64 {
        self.balances.get(&date).copied().unwrap_or_default()
    }

    pub fn available(&self, date: NaiveDate, leverage: f64) -> f64 {
        self.balance(date) * leverage
    }

    /// Debit `amount` if it fits within the leveraged balance. A shortfall
    /// leaves the ledger untouched.
    pub fn try_commit(
        &mut self,
        date: NaiveDate,
        amount: f64,
        leverage: f64,
    ) -> Result<(), MarginShortfall> {
        let available = self.available(date, leverage);
        if amount.is_nan() || amount > available {
            return Err(MarginShortfall { required: amount, available });
        }
        *self.balances.entry(date).or_default() -= amount;
        Ok(())
    }

    pub fn zero(&mut self, date: NaiveDate) {
        self.balances.insert(date, 0.0);
    }

    pub fn balances(&self) -> &BTreeMap<NaiveDate, f64> {
        &self.balances
    }
}
