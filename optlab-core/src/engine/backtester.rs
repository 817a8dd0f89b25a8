//! The date loop.
//!
//! Per valid date, ascending:
//!
//! 1. Carry margin forward from the previous valid date.
//! 2. Terminal date: liquidate every open position and zero margin.
//!    Other dates: settle expired options, then call the strategy.
//! 3. Append the portfolio summary for the date.
//!
//! After the loop the summary rows roll up into the period P&L series.

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use super::config::EngineConfig;
use super::date_grid::DateGrid;
use super::error::{ConfigurationError, EngineError};
use super::report::{period_pnl, BacktestReport, DateFailure};
use super::state::EngineState;
use super::strategy::{Strategy, TradingContext};
use crate::calendar::TradingCalendar;
use crate::domain::{IdAllocator, MarketData, Portfolio};

pub struct Backtester {
    config: EngineConfig,
    market: MarketData,
    calendar: Box<dyn TradingCalendar>,
    state: EngineState,
}

impl Backtester {
    pub fn new(config: EngineConfig, market: MarketData) -> Result<Self, ConfigurationError> {
        config.validate()?;
        let calendar = config.calendar.build();
        Ok(Self {
            config,
            market,
            calendar,
            state: EngineState::default(),
        })
    }

    pub fn with_calendar(mut self, calendar: impl TradingCalendar + 'static) -> Self {
        self.calendar = Box::new(calendar);
        self
    }

    pub fn with_id_allocator(mut self, ids: impl IdAllocator + 'static) -> Self {
        self.state.set_id_allocator(Box::new(ids));
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn market(&self) -> &MarketData {
        &self.market
    }

    /// Portfolio as left by the last run.
    pub fn portfolio(&self) -> &Portfolio {
        &self.state.portfolio
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn date_grid(&self) -> DateGrid {
        DateGrid::build(
            self.config.start_date,
            self.config.end_date,
            self.calendar.as_ref(),
            &self.market,
            &self.config.universe,
            &self.config.vol_universe,
        )
    }

    /// Run `strategy` over the date grid.
    pub fn backtest(&mut self, strategy: &mut dyn Strategy) -> Result<BacktestReport, EngineError> {
        let grid = self.date_grid();
        for skipped in grid.unprocessed_dates() {
            warn!(date = %skipped.date, reason = %skipped.reason, "date unprocessed");
        }
        let (Some(first), Some(last)) = (grid.first(), grid.last()) else {
            return Err(ConfigurationError::NoValidDates {
                start: self.config.start_date,
                end: self.config.end_date,
            }
            .into());
        };
        info!(
            strategy = strategy.name(),
            calendar = self.calendar.name(),
            %first, %last,
            valid = grid.len(),
            unprocessed = grid.unprocessed_dates().len(),
            "backtest starting"
        );

        self.state.reset();
        self.state.ledger.seed(first, self.config.starting_balance);

        let dates = grid.valid_dates();
        let mut summaries = Vec::new();
        for (i, &date) in dates.iter().enumerate() {
            if i > 0 {
                self.state.ledger.carry_forward(dates[i - 1], date);
            }
            let Some(snapshot) = self.market.get(date) else {
                self.fail_date(date, EngineError::MissingSnapshot(date).to_string());
                continue;
            };

            if date == last {
                let closed = self.state.liquidate(snapshot);
                debug!(%date, closed = closed.len(), "terminal liquidation");
            } else {
                if let Err(err) = self.state.settle_expiries(snapshot) {
                    self.fail_date(date, err.to_string());
                    continue;
                }
                let mut ctx = TradingContext::new(
                    snapshot,
                    &self.market,
                    &dates[..=i],
                    &self.config,
                    &mut self.state,
                );
                match strategy.on_data(&mut ctx) {
                    Ok(()) => {}
                    Err(err) if err.is_fatal() => return Err(err),
                    Err(err) => {
                        self.fail_date(date, err.to_string());
                        continue;
                    }
                }
            }

            match self.state.portfolio.summary(snapshot) {
                Ok(rows) => summaries.extend(rows),
                Err(err) => self.fail_date(date, err.to_string()),
            }
        }

        let period_pnl = period_pnl(&summaries, self.config.starting_balance);
        info!(
            positions = self.state.portfolio.len(),
            rows = summaries.len(),
            failed = self.state.diagnostics.failed_dates.len(),
            rejected = self.state.diagnostics.rejected_trades.len(),
            final_value = period_pnl.last().map(|p| p.value),
            "backtest finished"
        );

        Ok(BacktestReport {
            start_date: self.config.start_date,
            end_date: self.config.end_date,
            starting_balance: self.config.starting_balance,
            valid_dates: grid.valid_dates().to_vec(),
            holidays: grid.holidays().to_vec(),
            unprocessed_dates: grid.unprocessed_dates().to_vec(),
            summaries,
            period_pnl,
            margin: self.state.ledger.balances().clone(),
            diagnostics: self.state.diagnostics.clone(),
        })
    }

    fn fail_date(&mut self, date: NaiveDate, reason: String) {
        warn!(%date, %reason, "date processing failed");
        self.state.diagnostics.failed_dates.push(DateFailure { date, reason });
    }
}
