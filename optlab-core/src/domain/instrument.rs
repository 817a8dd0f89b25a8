//! Instrument vocabulary: asset kinds, trade direction and option terms.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Asset kind a trade request refers to.
///
/// `Bond` exists so that requests for it can be named and rejected; the
/// engine only admits equities and options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Equity,
    Option,
    Bond,
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AssetKind::Equity => "equity",
            AssetKind::Option => "option",
            AssetKind::Bond => "bond",
        };
        f.write_str(name)
    }
}

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// +1 for long, -1 for short.
    pub fn sign(self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionKind {
    Call,
    Put,
}

impl OptionKind {
    /// Exercise value at `spot`.
    pub fn payoff(self, spot: f64, strike: f64) -> f64 {
        match self {
            OptionKind::Call => (spot - strike).max(0.0),
            OptionKind::Put => (strike - spot).max(0.0),
        }
    }
}

/// European vanilla option terms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptionContract {
    pub strike: f64,
    pub expiry: NaiveDate,
    pub kind: OptionKind,
}

impl OptionContract {
    pub fn new(strike: f64, expiry: NaiveDate, kind: OptionKind) -> Self {
        Self { strike, expiry, kind }
    }

    pub fn call(strike: f64, expiry: NaiveDate) -> Self {
        Self::new(strike, expiry, OptionKind::Call)
    }

    pub fn put(strike: f64, expiry: NaiveDate) -> Self {
        Self::new(strike, expiry, OptionKind::Put)
    }

    pub fn payoff(&self, spot: f64) -> f64 {
        self.kind.payoff(spot, self.strike)
    }

    /// Calendar days from `ref_date` to expiry (negative once expired).
    pub fn days_to_expiry(&self, ref_date: NaiveDate) -> i64 {
        (self.expiry - ref_date).num_days()
    }

    pub fn is_expired_on(&self, ref_date: NaiveDate) -> bool {
        ref_date >= self.expiry
    }
}

/// The valuation variant a position carries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Instrument {
    Equity,
    Option(OptionContract),
}

impl Instrument {
    pub fn asset_kind(&self) -> AssetKind {
        match self {
            Instrument::Equity => AssetKind::Equity,
            Instrument::Option(_) => AssetKind::Option,
        }
    }

    pub fn option_contract(&self) -> Option<&OptionContract> {
        match self {
            Instrument::Option(contract) => Some(contract),
            Instrument::Equity => None,
        }
    }
}
