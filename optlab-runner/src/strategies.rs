//! Built-in strategies selectable from a config file.

use chrono::NaiveDate;
use optlab_core::domain::{OptionContract, OptionKind, Side, TradeId};
use optlab_core::engine::{Admission, EngineError, Strategy, TradeRequest, TradingContext};
use tracing::{info, warn};

use crate::config::StrategyConfig;

/// Buys `quantity` of `symbol` on the first date. Closes on the first date at
/// or after `exit_date`, otherwise holds until terminal liquidation.
#[derive(Debug, Clone)]
pub struct BuyAndHold {
    symbol: String,
    quantity: f64,
    exit_date: Option<NaiveDate>,
    trade_id: Option<TradeId>,
}

impl BuyAndHold {
    pub fn new(symbol: impl Into<String>, quantity: f64) -> Self {
        Self { symbol: symbol.into(), quantity, exit_date: None, trade_id: None }
    }

    pub fn with_exit_date(mut self, exit_date: NaiveDate) -> Self {
        self.exit_date = Some(exit_date);
        self
    }

    pub fn trade_id(&self) -> Option<TradeId> {
        self.trade_id
    }
}

impl Strategy for BuyAndHold {
    fn name(&self) -> &str {
        "buy_and_hold"
    }

    fn on_data(&mut self, ctx: &mut TradingContext<'_>) -> Result<(), EngineError> {
        if ctx.is_first_date() {
            match ctx.buy(&self.symbol, self.quantity)? {
                Admission::Accepted(id) => self.trade_id = Some(id),
                Admission::Rejected(shortfall) => {
                    warn!(
                        symbol = %self.symbol,
                        required = shortfall.required,
                        available = shortfall.available,
                        "buy_and_hold entry rejected"
                    );
                }
            }
            return Ok(());
        }

        if let (Some(exit), Some(id)) = (self.exit_date, self.trade_id) {
            if ctx.date() >= exit && ctx.portfolio().get(id).is_some_and(|p| p.is_open()) {
                ctx.close_trade(id)?;
                info!(trade_id = %id, date = %ctx.date(), "buy_and_hold exit");
            }
        }
        Ok(())
    }
}

/// Writes one option on the first date and lets it run to expiry settlement.
#[derive(Debug, Clone)]
pub struct SellOption {
    symbol: String,
    quantity: f64,
    contract: OptionContract,
    trade_id: Option<TradeId>,
}

impl SellOption {
    pub fn new(symbol: impl Into<String>, quantity: f64, contract: OptionContract) -> Self {
        Self { symbol: symbol.into(), quantity, contract, trade_id: None }
    }

    pub fn trade_id(&self) -> Option<TradeId> {
        self.trade_id
    }
}

impl Strategy for SellOption {
    fn name(&self) -> &str {
        match self.contract.kind {
            OptionKind::Call => "sell_call",
            OptionKind::Put => "sell_put",
        }
    }

    fn on_data(&mut self, ctx: &mut TradingContext<'_>) -> Result<(), EngineError> {
        if !ctx.is_first_date() {
            return Ok(());
        }
        let request = TradeRequest::option(&self.symbol, self.quantity, Side::Short, self.contract);
        match ctx.trade(request)? {
            Admission::Accepted(id) => self.trade_id = Some(id),
            Admission::Rejected(shortfall) => {
                warn!(
                    symbol = %self.symbol,
                    required = shortfall.required,
                    available = shortfall.available,
                    "option sale rejected"
                );
            }
        }
        Ok(())
    }
}

/// Instantiate the strategy a config names.
pub fn build_strategy(config: &StrategyConfig) -> Box<dyn Strategy> {
    match config {
        StrategyConfig::BuyAndHold { symbol, quantity, exit_date } => {
            let strategy = BuyAndHold::new(symbol.clone(), *quantity);
            Box::new(match exit_date {
                Some(exit) => strategy.with_exit_date(*exit),
                None => strategy,
            })
        }
        StrategyConfig::SellOption { symbol, quantity, strike, expiry, kind } => Box::new(
            SellOption::new(symbol.clone(), *quantity, OptionContract::new(*strike, *expiry, *kind)),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use optlab_core::domain::{EquityQuote, MarketData, MarketSnapshot};
    use optlab_core::engine::{Backtester, EngineConfig};

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn market() -> MarketData {
        (2..=5)
            .map(|day| {
                let close = 100.0 + day as f64;
                let mut snap = MarketSnapshot::new(d(day));
                snap.equity.insert(
                    "XYZ".into(),
                    EquityQuote { open: close, high: close, low: close, close, dividend_yield: 0.0 },
                );
                snap
            })
            .collect()
    }

    #[test]
    fn buy_and_hold_exits_on_exit_date() {
        let config = EngineConfig::new(["XYZ"], d(2), d(5), 1000.0);
        let mut bt = Backtester::new(config, market()).unwrap();
        let mut strategy = BuyAndHold::new("XYZ", 2.0).with_exit_date(d(4));
        let report = bt.backtest(&mut strategy).unwrap();

        let id = strategy.trade_id().unwrap();
        let pos = bt.portfolio().get(id).unwrap();
        assert_eq!(pos.closed_on(), Some(d(4)));
        assert_eq!(pos.closed_pnl(), 4.0);
        assert_eq!(report.final_value(), Some(1004.0));
    }

    #[test]
    fn buy_and_hold_without_exit_is_liquidated_at_the_end() {
        let config = EngineConfig::new(["XYZ"], d(2), d(5), 1000.0);
        let mut bt = Backtester::new(config, market()).unwrap();
        let mut strategy = BuyAndHold::new("XYZ", 1.0);
        bt.backtest(&mut strategy).unwrap();

        let pos = bt.portfolio().get(strategy.trade_id().unwrap()).unwrap();
        assert_eq!(pos.closed_on(), Some(d(5)));
        assert_eq!(pos.closed_pnl(), 3.0);
    }

    #[test]
    fn rejected_entry_leaves_no_trade() {
        let config = EngineConfig::new(["XYZ"], d(2), d(5), 10.0);
        let mut bt = Backtester::new(config, market()).unwrap();
        let mut strategy = BuyAndHold::new("XYZ", 1.0);
        let report = bt.backtest(&mut strategy).unwrap();

        assert!(strategy.trade_id().is_none());
        assert_eq!(report.diagnostics.rejected_trades.len(), 1);
        assert!(report.summaries.is_empty());
    }

    #[test]
    fn factory_names_match_config() {
        let sell = StrategyConfig::SellOption {
            symbol: "XYZ".into(),
            quantity: 1.0,
            strike: 100.0,
            expiry: d(19),
            kind: OptionKind::Call,
        };
        assert_eq!(build_strategy(&sell).name(), "sell_call");

        let hold = StrategyConfig::BuyAndHold { symbol: "XYZ".into(), quantity: 1.0, exit_date: None };
        assert_eq!(build_strategy(&hold).name(), "buy_and_hold");
    }
}
