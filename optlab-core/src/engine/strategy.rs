//! The strategy callback and the trading context it is handed each date.

use chrono::NaiveDate;

use super::config::EngineConfig;
use super::error::EngineError;
use super::state::{Admission, EngineState, TradeRequest};
use crate::domain::{AssetKind, ClosedTrade, MarketData, MarketSnapshot, Portfolio, Side, TradeId};

/// Decision logic driven by the engine once per valid, non-terminal date.
pub trait Strategy {
    fn name(&self) -> &str {
        "strategy"
    }

    /// Inspect the market and submit trades through `ctx`.
    ///
    /// Returning a [`EngineError::Configuration`] aborts the run; any other
    /// error fails only the current date.
    fn on_data(&mut self, ctx: &mut TradingContext<'_>) -> Result<(), EngineError>;
}

/// What a strategy may see and do on one date.
pub struct TradingContext<'a> {
    snapshot: &'a MarketSnapshot,
    market: &'a MarketData,
    history: &'a [NaiveDate],
    config: &'a EngineConfig,
    state: &'a mut EngineState,
}

impl<'a> TradingContext<'a> {
    /// `history` is the valid dates up to and including the snapshot date.
    pub fn new(
        snapshot: &'a MarketSnapshot,
        market: &'a MarketData,
        history: &'a [NaiveDate],
        config: &'a EngineConfig,
        state: &'a mut EngineState,
    ) -> Self {
        Self { snapshot, market, history, config, state }
    }

    pub fn date(&self) -> NaiveDate {
        self.snapshot.ref_date
    }

    pub fn snapshot(&self) -> &MarketSnapshot {
        self.snapshot
    }

    pub fn config(&self) -> &EngineConfig {
        self.config
    }

    /// Whether this is the first date the strategy is called on.
    pub fn is_first_date(&self) -> bool {
        self.history.len() <= 1
    }

    /// Snapshots of every valid date so far, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &MarketSnapshot> + '_ {
        self.history.iter().filter_map(|date| self.market.get(*date))
    }

    /// Close prices of `symbol` over the valid dates so far.
    pub fn close_series(&self, symbol: &str) -> Vec<(NaiveDate, f64)> {
        self.history()
            .filter_map(|snap| snap.close(symbol).map(|close| (snap.ref_date, close)))
            .collect()
    }

    pub fn portfolio(&self) -> &Portfolio {
        &self.state.portfolio
    }

    /// Margin balance of the current date.
    pub fn margin(&self) -> f64 {
        self.state.ledger.balance(self.date())
    }

    pub fn available_margin(&self) -> f64 {
        self.state.ledger.available(self.date(), self.config.leverage)
    }

    pub fn trade(&mut self, request: TradeRequest) -> Result<Admission, EngineError> {
        self.state.admit(self.config, self.snapshot, &request)
    }

    pub fn buy(&mut self, symbol: &str, quantity: f64) -> Result<Admission, EngineError> {
        self.trade(TradeRequest::equity(symbol, quantity, Side::Long))
    }

    pub fn sell(&mut self, symbol: &str, quantity: f64) -> Result<Admission, EngineError> {
        self.trade(TradeRequest::equity(symbol, quantity, Side::Short))
    }

    pub fn close_trade(&mut self, trade_id: TradeId) -> Result<Option<f64>, EngineError> {
        self.state.close_trade(self.snapshot, trade_id)
    }

    pub fn close_position(
        &mut self,
        symbol: &str,
        kind: AssetKind,
    ) -> Result<Vec<ClosedTrade>, EngineError> {
        Ok(self.state.close_position(self.snapshot, symbol, kind)?)
    }
}
