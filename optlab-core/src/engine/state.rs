//! Mutable engine state and the trade admission rules that change it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::config::EngineConfig;
use super::error::{ConfigurationError, EngineError};
use super::margin::{required_commitment, MarginLedger, MarginShortfall};
use super::report::{Diagnostics, LiquidationFallback, RejectedTrade};
use crate::domain::{
    AssetKind, ClosedTrade, IdAllocator, Instrument, MarketSnapshot, OptionContract, OptionKind,
    Portfolio, Position, SequentialIds, Side, TradeId, ValuationError,
};

/// A strategy's request to open a position.
///
/// Option terms are optional so that incomplete requests can be expressed and
/// rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRequest {
    pub symbol: String,
    pub quantity: f64,
    pub side: Side,
    pub asset_kind: AssetKind,
    #[serde(default)]
    pub strike: Option<f64>,
    #[serde(default)]
    pub expiry: Option<NaiveDate>,
    #[serde(default)]
    pub option_kind: Option<OptionKind>,
}

impl TradeRequest {
    pub fn new(symbol: impl Into<String>, quantity: f64, side: Side, asset_kind: AssetKind) -> Self {
        Self {
            symbol: symbol.into(),
            quantity,
            side,
            asset_kind,
            strike: None,
            expiry: None,
            option_kind: None,
        }
    }

    pub fn equity(symbol: impl Into<String>, quantity: f64, side: Side) -> Self {
        Self::new(symbol, quantity, side, AssetKind::Equity)
    }

    pub fn option(
        symbol: impl Into<String>,
        quantity: f64,
        side: Side,
        contract: OptionContract,
    ) -> Self {
        Self::new(symbol, quantity, side, AssetKind::Option)
            .with_strike(contract.strike)
            .with_expiry(contract.expiry)
            .with_option_kind(contract.kind)
    }

    pub fn with_strike(mut self, strike: f64) -> Self {
        self.strike = Some(strike);
        self
    }

    pub fn with_expiry(mut self, expiry: NaiveDate) -> Self {
        self.expiry = Some(expiry);
        self
    }

    pub fn with_option_kind(mut self, kind: OptionKind) -> Self {
        self.option_kind = Some(kind);
        self
    }

    /// Resolve the valuation variant, checking the request against `config`
    /// and the trade date.
    fn instrument(
        &self,
        config: &EngineConfig,
        trade_date: NaiveDate,
    ) -> Result<Instrument, ConfigurationError> {
        if !(self.quantity.is_finite() && self.quantity > 0.0) {
            return Err(ConfigurationError::NotPositive {
                field: "quantity",
                value: self.quantity,
            });
        }
        if !config.in_universe(&self.symbol) {
            return Err(ConfigurationError::UnknownSymbol {
                symbol: self.symbol.clone(),
                universe: "universe",
            });
        }

        match self.asset_kind {
            AssetKind::Equity => Ok(Instrument::Equity),
            AssetKind::Option => {
                let missing = |field| ConfigurationError::MissingOptionTerms {
                    symbol: self.symbol.clone(),
                    field,
                };
                let strike = self.strike.ok_or_else(|| missing("strike"))?;
                let expiry = self.expiry.ok_or_else(|| missing("expiry"))?;
                let kind = self.option_kind.ok_or_else(|| missing("call/put flag"))?;

                if !config.in_vol_universe(&self.symbol) {
                    return Err(ConfigurationError::UnknownSymbol {
                        symbol: self.symbol.clone(),
                        universe: "vol universe",
                    });
                }
                if !(strike.is_finite() && strike > 0.0) {
                    return Err(ConfigurationError::NotPositive { field: "strike", value: strike });
                }
                if expiry <= trade_date {
                    return Err(ConfigurationError::ExpiryNotAfterTrade {
                        symbol: self.symbol.clone(),
                        expiry,
                        date: trade_date,
                    });
                }
                Ok(Instrument::Option(OptionContract::new(strike, expiry, kind)))
            }
            other => Err(ConfigurationError::UnsupportedAssetKind(other)),
        }
    }
}

/// Result of trade admission.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Admission {
    Accepted(TradeId),
    Rejected(MarginShortfall),
}

impl Admission {
    pub fn trade_id(&self) -> Option<TradeId> {
        match self {
            Admission::Accepted(id) => Some(*id),
            Admission::Rejected(_) => None,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Admission::Accepted(_))
    }
}

/// Portfolio, margin ledger and diagnostics of a run in progress.
pub struct EngineState {
    pub portfolio: Portfolio,
    pub ledger: MarginLedger,
    pub diagnostics: Diagnostics,
    ids: Box<dyn IdAllocator>,
}

impl std::fmt::Debug for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineState")
            .field("portfolio", &self.portfolio)
            .field("ledger", &self.ledger)
            .field("diagnostics", &self.diagnostics)
            .finish_non_exhaustive()
    }
}

impl Default for EngineState {
    fn default() -> Self {
        Self::new(Box::new(SequentialIds::new()))
    }
}

impl EngineState {
    pub fn new(ids: Box<dyn IdAllocator>) -> Self {
        Self {
            portfolio: Portfolio::new(),
            ledger: MarginLedger::new(),
            diagnostics: Diagnostics::default(),
            ids,
        }
    }

    pub fn set_id_allocator(&mut self, ids: Box<dyn IdAllocator>) {
        self.ids = ids;
    }

    /// Clear portfolio, ledger and diagnostics. The id allocator keeps its
    /// position so ids are never reissued.
    pub fn reset(&mut self) {
        self.portfolio = Portfolio::new();
        self.ledger = MarginLedger::new();
        self.diagnostics = Diagnostics::default();
    }

    /// Price the requested position against `snapshot` and admit it if its
    /// margin commitment fits in the leveraged balance of the snapshot date.
    pub fn admit(
        &mut self,
        config: &EngineConfig,
        snapshot: &MarketSnapshot,
        request: &TradeRequest,
    ) -> Result<Admission, EngineError> {
        let date = snapshot.ref_date;
        let instrument = request.instrument(config, date)?;
        let trade_id = self.ids.allocate().map_err(ConfigurationError::from)?;
        let position = Position::open(
            trade_id,
            request.symbol.as_str(),
            instrument,
            request.quantity,
            request.side,
            snapshot,
        )?;
        let commitment = required_commitment(&position, config.short_haircut);

        match self.ledger.try_commit(date, commitment, config.leverage) {
            Ok(()) => {
                debug!(
                    %date, %trade_id, symbol = %request.symbol, kind = %request.asset_kind,
                    quantity = request.quantity, entry = position.entry_price(), commitment,
                    "trade admitted"
                );
                self.portfolio.add(position);
                Ok(Admission::Accepted(trade_id))
            }
            Err(shortfall) => {
                warn!(
                    %date, symbol = %request.symbol, kind = %request.asset_kind,
                    required = shortfall.required, available = shortfall.available,
                    "trade rejected: insufficient margin"
                );
                self.diagnostics.rejected_trades.push(RejectedTrade {
                    date,
                    symbol: request.symbol.clone(),
                    asset_kind: request.asset_kind,
                    side: request.side,
                    quantity: request.quantity,
                    required: shortfall.required,
                    available: shortfall.available,
                });
                Ok(Admission::Rejected(shortfall))
            }
        }
    }

    /// Close one position at the snapshot. The margin ledger is left as is.
    /// `Ok(None)` if it was already closed.
    pub fn close_trade(
        &mut self,
        snapshot: &MarketSnapshot,
        trade_id: TradeId,
    ) -> Result<Option<f64>, EngineError> {
        let position = self
            .portfolio
            .get_mut(trade_id)
            .ok_or(EngineError::UnknownTrade(trade_id))?;
        let realized = position.close(snapshot)?;
        if let Some(pnl) = realized {
            debug!(date = %snapshot.ref_date, %trade_id, pnl, "trade closed");
        }
        Ok(realized)
    }

    /// Close the open positions on `symbol` of `kind`.
    pub fn close_position(
        &mut self,
        snapshot: &MarketSnapshot,
        symbol: &str,
        kind: AssetKind,
    ) -> Result<Vec<ClosedTrade>, ValuationError> {
        self.portfolio.close_by(snapshot, symbol, kind)
    }

    /// Settle options whose expiry has been reached.
    pub fn settle_expiries(
        &mut self,
        snapshot: &MarketSnapshot,
    ) -> Result<Vec<ClosedTrade>, ValuationError> {
        let settled = self.portfolio.settle_expiries(snapshot)?;
        for trade in &settled {
            debug!(date = %snapshot.ref_date, trade_id = %trade.trade_id, pnl = trade.realized_pnl, "option settled at expiry");
        }
        Ok(settled)
    }

    /// Terminal liquidation: close everything and zero the date's margin.
    pub fn liquidate(&mut self, snapshot: &MarketSnapshot) -> Vec<ClosedTrade> {
        let date = snapshot.ref_date;
        let closed = self.portfolio.close_all(snapshot);
        for trade in &closed {
            if let Some(reason) = &trade.fallback {
                warn!(%date, trade_id = %trade.trade_id, %reason, "liquidation fallback");
                self.diagnostics.liquidation_fallbacks.push(LiquidationFallback {
                    date,
                    trade_id: trade.trade_id,
                    symbol: trade.symbol.clone(),
                    reason: reason.clone(),
                });
            }
        }
        self.ledger.zero(date);
        closed
    }
}
