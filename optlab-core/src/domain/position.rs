//! Positions and their valuation rules.
//!
//! A position's entry price is fixed when it is opened. Closing is a single
//! transition: realized P&L is recorded, quantity drops to zero and the
//! position stays in the portfolio for audit.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::ids::TradeId;
use super::instrument::{AssetKind, Instrument, OptionContract, Side};
use super::snapshot::MarketSnapshot;
use crate::pricing::{year_fraction, BlackScholesMerton, PricingError, SurfaceError, VolSurface};

/// Why a position could not be valued against a snapshot.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValuationError {
    #[error("no usable close price for {symbol} on {date}")]
    MissingPrice { symbol: String, date: NaiveDate },

    #[error("no volatility surface for {symbol} on {date}")]
    MissingSurface { symbol: String, date: NaiveDate },

    #[error("no risk-free rate on {date}")]
    MissingRate { date: NaiveDate },

    #[error("volatility surface for {symbol} on {date}: {source}")]
    Surface {
        symbol: String,
        date: NaiveDate,
        #[source]
        source: SurfaceError,
    },

    #[error("pricing {symbol} on {date}: {source}")]
    Pricing {
        symbol: String,
        date: NaiveDate,
        #[source]
        source: PricingError,
    },
}

/// Per-variant valuation rule: unit price of `symbol` under `snapshot`.
pub trait Valuation {
    fn calculate_value(&self, symbol: &str, snapshot: &MarketSnapshot)
        -> Result<f64, ValuationError>;
}

fn spot(symbol: &str, snapshot: &MarketSnapshot) -> Result<f64, ValuationError> {
    snapshot.close(symbol).ok_or_else(|| ValuationError::MissingPrice {
        symbol: symbol.to_string(),
        date: snapshot.ref_date,
    })
}

impl Valuation for OptionContract {
    /// Payoff on the expiry date, zero after it, BSM value before it.
    fn calculate_value(
        &self,
        symbol: &str,
        snapshot: &MarketSnapshot,
    ) -> Result<f64, ValuationError> {
        let date = snapshot.ref_date;
        if date > self.expiry {
            return Ok(0.0);
        }
        let spot = spot(symbol, snapshot)?;
        if date == self.expiry {
            return Ok(self.payoff(spot));
        }

        let data = snapshot.surface(symbol).ok_or_else(|| ValuationError::MissingSurface {
            symbol: symbol.to_string(),
            date,
        })?;
        let surface_err = |source| ValuationError::Surface {
            symbol: symbol.to_string(),
            date,
            source,
        };
        let surface = VolSurface::from_data(data).map_err(surface_err)?;
        let days = self.days_to_expiry(date) as f64;
        let sigma = surface
            .vol_for_strike(self.strike, spot, days)
            .map_err(surface_err)?;

        let rate = snapshot
            .risk_free_rate()
            .ok_or(ValuationError::MissingRate { date })?;
        let dividend = snapshot
            .quote(symbol)
            .map(|q| q.dividend_yield)
            .unwrap_or_default();

        BlackScholesMerton::new(rate, dividend)
            .price(spot, self.strike, year_fraction(date, self.expiry), sigma, self.kind)
            .map_err(|source| ValuationError::Pricing {
                symbol: symbol.to_string(),
                date,
                source,
            })
    }
}

impl Valuation for Instrument {
    fn calculate_value(
        &self,
        symbol: &str,
        snapshot: &MarketSnapshot,
    ) -> Result<f64, ValuationError> {
        match self {
            Instrument::Equity => spot(symbol, snapshot),
            Instrument::Option(contract) => contract.calculate_value(symbol, snapshot),
        }
    }
}

/// A single trade held in the portfolio.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    trade_id: TradeId,
    symbol: String,
    instrument: Instrument,
    side: Side,
    quantity: f64,
    trade_date: NaiveDate,
    entry_price: f64,
    initial_notional: f64,
    is_open: bool,
    closed_pnl: f64,
    closed_on: Option<NaiveDate>,
}

impl Position {
    /// Open a position, pricing it against the trade-date snapshot.
    pub fn open(
        trade_id: TradeId,
        symbol: impl Into<String>,
        instrument: Instrument,
        quantity: f64,
        side: Side,
        snapshot: &MarketSnapshot,
    ) -> Result<Self, ValuationError> {
        let symbol = symbol.into();
        let entry_price = instrument.calculate_value(&symbol, snapshot)?;
        Ok(Self {
            trade_id,
            symbol,
            instrument,
            side,
            quantity,
            trade_date: snapshot.ref_date,
            entry_price,
            initial_notional: entry_price * quantity,
            is_open: true,
            closed_pnl: 0.0,
            closed_on: None,
        })
    }

    pub fn trade_id(&self) -> TradeId {
        self.trade_id
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn instrument(&self) -> &Instrument {
        &self.instrument
    }

    pub fn asset_kind(&self) -> AssetKind {
        self.instrument.asset_kind()
    }

    pub fn side(&self) -> Side {
        self.side
    }

    /// +1 long, -1 short.
    pub fn direction(&self) -> f64 {
        self.side.sign()
    }

    pub fn quantity(&self) -> f64 {
        self.quantity
    }

    pub fn trade_date(&self) -> NaiveDate {
        self.trade_date
    }

    pub fn entry_price(&self) -> f64 {
        self.entry_price
    }

    pub fn initial_notional(&self) -> f64 {
        self.initial_notional
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn closed_pnl(&self) -> f64 {
        self.closed_pnl
    }

    pub fn closed_on(&self) -> Option<NaiveDate> {
        self.closed_on
    }

    /// Unit value under `snapshot`, regardless of open state.
    pub fn calculate_value(&self, snapshot: &MarketSnapshot) -> Result<f64, ValuationError> {
        self.instrument.calculate_value(&self.symbol, snapshot)
    }

    /// Unrealized P&L; zero once closed.
    pub fn calculate_pnl(&self, snapshot: &MarketSnapshot) -> Result<f64, ValuationError> {
        if !self.is_open {
            return Ok(0.0);
        }
        let value = self.calculate_value(snapshot)?;
        Ok(self.pnl_at(value))
    }

    /// Signed market value of the holding; zero once closed.
    pub fn market_value(&self, snapshot: &MarketSnapshot) -> Result<f64, ValuationError> {
        if !self.is_open {
            return Ok(0.0);
        }
        Ok(self.calculate_value(snapshot)? * self.direction() * self.quantity)
    }

    /// Exercise value: spot for equities, payoff at spot for options.
    pub fn intrinsic_value(&self, snapshot: &MarketSnapshot) -> Result<f64, ValuationError> {
        let spot = spot(&self.symbol, snapshot)?;
        Ok(match &self.instrument {
            Instrument::Equity => spot,
            Instrument::Option(contract) => contract.payoff(spot),
        })
    }

    /// Whether this is an option whose expiry is on or before `date`.
    pub fn is_expired_on(&self, date: NaiveDate) -> bool {
        self.instrument
            .option_contract()
            .is_some_and(|c| c.is_expired_on(date))
    }

    /// Unit price a close against `snapshot` would realize: payoff for an
    /// expired option, the variant's valuation otherwise.
    pub fn exit_price(&self, snapshot: &MarketSnapshot) -> Result<f64, ValuationError> {
        if self.is_expired_on(snapshot.ref_date) {
            self.intrinsic_value(snapshot)
        } else {
            self.calculate_value(snapshot)
        }
    }

    /// Close against `snapshot`. Returns the realized P&L, or `None` if the
    /// position was already closed.
    pub fn close(&mut self, snapshot: &MarketSnapshot) -> Result<Option<f64>, ValuationError> {
        if !self.is_open {
            return Ok(None);
        }
        let price = self.exit_price(snapshot)?;
        Ok(self.close_at_price(price, snapshot.ref_date))
    }

    /// Settle an open option whose expiry has been reached: realized P&L is
    /// `(payoff - entry) * quantity * direction`. No-op for anything else.
    pub fn settle_expiry(
        &mut self,
        snapshot: &MarketSnapshot,
    ) -> Result<Option<f64>, ValuationError> {
        if !self.is_open || !self.is_expired_on(snapshot.ref_date) {
            return Ok(None);
        }
        let payoff = self.intrinsic_value(snapshot)?;
        Ok(self.close_at_price(payoff, snapshot.ref_date))
    }

    /// Close at an explicit unit price.
    pub fn close_at_price(&mut self, price: f64, date: NaiveDate) -> Option<f64> {
        if !self.is_open {
            return None;
        }
        let pnl = self.pnl_at(price);
        self.closed_pnl = pnl;
        self.quantity = 0.0;
        self.is_open = false;
        self.closed_on = Some(date);
        Some(pnl)
    }

    fn pnl_at(&self, price: f64) -> f64 {
        (price - self.entry_price) * self.direction() * self.quantity
    }
}
