//! Portfolio: insertion-ordered positions and their aggregates.
//!
//! Every aggregate is recomputed against the snapshot passed in. Closed
//! positions are never removed.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::ids::TradeId;
use super::instrument::{AssetKind, Side};
use super::position::{Position, ValuationError};
use super::snapshot::MarketSnapshot;

/// One row of the per-date summary table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSummary {
    pub date: NaiveDate,
    pub trade_id: TradeId,
    pub symbol: String,
    pub asset_kind: AssetKind,
    pub side: Side,
    pub quantity: f64,
    pub entry_price: f64,
    pub is_alive: bool,
    /// Unit value on `date`; 0 once closed.
    pub current_value: f64,
    pub open_pnl: f64,
    pub closed_pnl: f64,
    pub global_pnl: f64,
}

/// Outcome of a close transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedTrade {
    pub trade_id: TradeId,
    pub symbol: String,
    pub realized_pnl: f64,
    /// Set when the position could not be valued and was closed at a
    /// fallback price.
    pub fallback: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Portfolio {
    positions: Vec<Position>,
}

impl Portfolio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, position: Position) {
        self.positions.push(position);
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn get(&self, trade_id: TradeId) -> Option<&Position> {
        self.positions.iter().find(|p| p.trade_id() == trade_id)
    }

    pub fn get_mut(&mut self, trade_id: TradeId) -> Option<&mut Position> {
        self.positions.iter_mut().find(|p| p.trade_id() == trade_id)
    }

    pub fn open_positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.iter().filter(|p| p.is_open())
    }

    /// Positions (open or closed) on `symbol` of the given kind.
    pub fn positions_for<'a>(
        &'a self,
        symbol: &'a str,
        kind: AssetKind,
    ) -> impl Iterator<Item = &'a Position> + 'a {
        self.positions
            .iter()
            .filter(move |p| p.symbol() == symbol && p.asset_kind() == kind)
    }

    /// Signed open quantity on `symbol` of the given kind.
    pub fn position_quantity(&self, symbol: &str, kind: AssetKind) -> f64 {
        self.positions_for(symbol, kind)
            .filter(|p| p.is_open())
            .map(|p| p.quantity() * p.direction())
            .sum()
    }

    /// Entry notional of the open positions.
    pub fn total_notional(&self) -> f64 {
        self.open_positions().map(Position::initial_notional).sum()
    }

    /// Signed market value of the open positions.
    pub fn total_value(&self, snapshot: &MarketSnapshot) -> Result<f64, ValuationError> {
        self.open_positions()
            .map(|p| p.market_value(snapshot))
            .sum()
    }

    pub fn open_pnl(&self, snapshot: &MarketSnapshot) -> Result<f64, ValuationError> {
        self.positions.iter().map(|p| p.calculate_pnl(snapshot)).sum()
    }

    pub fn closed_pnl(&self) -> f64 {
        self.positions.iter().map(Position::closed_pnl).sum()
    }

    pub fn global_pnl(&self, snapshot: &MarketSnapshot) -> Result<f64, ValuationError> {
        Ok(self.open_pnl(snapshot)? + self.closed_pnl())
    }

    /// One row per position, tagged with the snapshot date.
    pub fn summary(&self, snapshot: &MarketSnapshot) -> Result<Vec<PositionSummary>, ValuationError> {
        self.positions
            .iter()
            .map(|p| {
                let (current_value, open_pnl) = if p.is_open() {
                    let value = p.calculate_value(snapshot)?;
                    (value, p.calculate_pnl(snapshot)?)
                } else {
                    (0.0, 0.0)
                };
                Ok(PositionSummary {
                    date: snapshot.ref_date,
                    trade_id: p.trade_id(),
                    symbol: p.symbol().to_string(),
                    asset_kind: p.asset_kind(),
                    side: p.side(),
                    quantity: p.quantity(),
                    entry_price: p.entry_price(),
                    is_alive: p.is_open(),
                    current_value,
                    open_pnl,
                    closed_pnl: p.closed_pnl(),
                    global_pnl: open_pnl + p.closed_pnl(),
                })
            })
            .collect()
    }

    /// Close every open position matching `pred`.
    ///
    /// Exit prices are computed before any position is touched, so a
    /// valuation failure leaves the portfolio unchanged.
    pub fn close_where<F>(
        &mut self,
        snapshot: &MarketSnapshot,
        mut pred: F,
    ) -> Result<Vec<ClosedTrade>, ValuationError>
    where
        F: FnMut(&Position) -> bool,
    {
        let exits = self
            .positions
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_open() && pred(*p))
            .map(|(i, p)| Ok((i, p.exit_price(snapshot)?)))
            .collect::<Result<Vec<_>, ValuationError>>()?;

        Ok(exits
            .into_iter()
            .filter_map(|(i, price)| {
                let pos = &mut self.positions[i];
                pos.close_at_price(price, snapshot.ref_date)
                    .map(|realized_pnl| ClosedTrade {
                        trade_id: pos.trade_id(),
                        symbol: pos.symbol().to_string(),
                        realized_pnl,
                        fallback: None,
                    })
            })
            .collect())
    }

    /// Close the open positions on `symbol` of the given kind.
    pub fn close_by(
        &mut self,
        snapshot: &MarketSnapshot,
        symbol: &str,
        kind: AssetKind,
    ) -> Result<Vec<ClosedTrade>, ValuationError> {
        self.close_where(snapshot, |p| p.symbol() == symbol && p.asset_kind() == kind)
    }

    /// Settle every open option whose expiry has been reached.
    pub fn settle_expiries(
        &mut self,
        snapshot: &MarketSnapshot,
    ) -> Result<Vec<ClosedTrade>, ValuationError> {
        let date = snapshot.ref_date;
        self.close_where(snapshot, |p| p.is_expired_on(date))
    }

    /// Close every open position. Never fails: a position that cannot be
    /// valued is closed at its intrinsic value, or at its entry price when
    /// even that is unavailable, and the outcome records why.
    pub fn close_all(&mut self, snapshot: &MarketSnapshot) -> Vec<ClosedTrade> {
        let date = snapshot.ref_date;
        self.positions
            .iter_mut()
            .filter(|p| p.is_open())
            .filter_map(|pos| {
                let (price, fallback) = match pos.exit_price(snapshot) {
                    Ok(price) => (price, None),
                    Err(err) => match pos.intrinsic_value(snapshot) {
                        Ok(price) => (price, Some(format!("{err}; closed at intrinsic value"))),
                        Err(_) => (
                            pos.entry_price(),
                            Some(format!("{err}; closed at entry price")),
                        ),
                    },
                };
                pos.close_at_price(price, date).map(|realized_pnl| ClosedTrade {
                    trade_id: pos.trade_id(),
                    symbol: pos.symbol().to_string(),
                    realized_pnl,
                    fallback,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EquityQuote, Instrument, OptionContract};

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn snapshot(date: NaiveDate, prices: &[(&str, f64)]) -> MarketSnapshot {
        let mut snap = MarketSnapshot::new(date);
        for &(sym, close) in prices {
            snap.equity.insert(
                sym.into(),
                EquityQuote { open: close, high: close, low: close, close, dividend_yield: 0.0 },
            );
        }
        snap.rate.riskfree = Some(0.02);
        snap
    }

    fn equity(id: u32, sym: &str, qty: f64, side: Side, snap: &MarketSnapshot) -> Position {
        Position::open(TradeId(id), sym, Instrument::Equity, qty, side, snap).unwrap()
    }

    #[test]
    fn aggregates_over_open_and_closed() {
        let day1 = snapshot(d(2), &[("AAA", 10.0), ("BBB", 50.0)]);
        let mut pf = Portfolio::new();
        pf.add(equity(10_000, "AAA", 2.0, Side::Long, &day1));
        pf.add(equity(10_001, "BBB", 1.0, Side::Short, &day1));
        assert_eq!(pf.total_notional(), 70.0);

        let day2 = snapshot(d(3), &[("AAA", 12.0), ("BBB", 45.0)]);
        assert_eq!(pf.open_pnl(&day2).unwrap(), 4.0 + 5.0);
        assert_eq!(pf.total_value(&day2).unwrap(), 24.0 - 45.0);
        assert_eq!(pf.position_quantity("BBB", AssetKind::Equity), -1.0);

        let closed = pf.close_by(&day2, "AAA", AssetKind::Equity).unwrap();
        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].realized_pnl, 4.0);
        assert_eq!(pf.len(), 2);
        assert_eq!(pf.closed_pnl(), 4.0);
        assert_eq!(pf.total_notional(), 50.0);

        let day3 = snapshot(d(4), &[("AAA", 1.0), ("BBB", 40.0)]);
        assert_eq!(pf.global_pnl(&day3).unwrap(), 4.0 + 10.0);
    }

    #[test]
    fn summary_has_one_row_per_position() {
        let day1 = snapshot(d(2), &[("AAA", 10.0)]);
        let mut pf = Portfolio::new();
        pf.add(equity(10_000, "AAA", 1.0, Side::Long, &day1));
        pf.add(equity(10_001, "AAA", 3.0, Side::Long, &day1));
        pf.close_where(&day1, |p| p.trade_id() == TradeId(10_000)).unwrap();

        let rows = pf.summary(&snapshot(d(3), &[("AAA", 11.0)])).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(!rows[0].is_alive);
        assert_eq!(rows[0].current_value, 0.0);
        assert_eq!(rows[0].quantity, 0.0);
        assert!(rows[1].is_alive);
        assert_eq!(rows[1].current_value, 11.0);
        assert_eq!(rows[1].open_pnl, 3.0);
        assert_eq!(rows[1].global_pnl, 3.0);
        assert!(rows.iter().all(|r| r.date == d(3)));
    }

    #[test]
    fn failed_close_where_leaves_positions_open() {
        let day1 = snapshot(d(2), &[("AAA", 10.0), ("BBB", 5.0)]);
        let mut pf = Portfolio::new();
        pf.add(equity(10_000, "AAA", 1.0, Side::Long, &day1));
        pf.add(equity(10_001, "BBB", 1.0, Side::Long, &day1));

        // BBB missing on day 2
        let day2 = snapshot(d(3), &[("AAA", 11.0)]);
        assert!(pf.close_where(&day2, |_| true).is_err());
        assert_eq!(pf.open_positions().count(), 2);
    }

    #[test]
    fn close_all_falls_back_instead_of_failing() {
        let day1 = snapshot(d(2), &[("AAA", 10.0), ("BBB", 5.0)]);
        let mut pf = Portfolio::new();
        pf.add(equity(10_000, "AAA", 1.0, Side::Long, &day1));
        pf.add(equity(10_001, "BBB", 1.0, Side::Long, &day1));

        let day2 = snapshot(d(3), &[("AAA", 11.0)]);
        let closed = pf.close_all(&day2);
        assert_eq!(closed.len(), 2);
        assert_eq!(closed[0].realized_pnl, 1.0);
        assert!(closed[0].fallback.is_none());
        assert_eq!(closed[1].realized_pnl, 0.0);
        assert!(closed[1].fallback.is_some());
        assert_eq!(pf.open_positions().count(), 0);

        // a second liquidation has nothing left to do
        assert!(pf.close_all(&day2).is_empty());
    }

    #[test]
    fn close_all_uses_intrinsic_when_option_cannot_be_priced() {
        let mut day1 = snapshot(d(2), &[("AAA", 100.0)]);
        day1.volatility.insert(
            "AAA".into(),
            crate::domain::VolSurfaceData {
                moneyness: vec![0.9, 1.1],
                tenor: vec![30],
                volatility: vec![vec![0.2], vec![0.2]],
            },
        );
        let contract = OptionContract::call(95.0, d(31));
        let mut pf = Portfolio::new();
        pf.add(
            Position::open(TradeId(10_000), "AAA", Instrument::Option(contract), 1.0, Side::Long, &day1)
                .unwrap(),
        );
        let entry = pf.positions()[0].entry_price();

        // no surface on the liquidation date
        let day2 = snapshot(d(10), &[("AAA", 101.0)]);
        let closed = pf.close_all(&day2);
        assert!((closed[0].realized_pnl - (6.0 - entry)).abs() < 1e-12);
        assert!(closed[0].fallback.as_deref().unwrap().contains("intrinsic"));
    }

    #[test]
    fn settle_expiries_only_touches_expired_options() {
        let mut day1 = snapshot(d(2), &[("AAA", 100.0)]);
        day1.volatility.insert(
            "AAA".into(),
            crate::domain::VolSurfaceData {
                moneyness: vec![0.9, 1.1],
                tenor: vec![7, 30],
                volatility: vec![vec![0.2, 0.2], vec![0.2, 0.2]],
            },
        );
        let mut pf = Portfolio::new();
        pf.add(equity(10_000, "AAA", 1.0, Side::Long, &day1));
        let short_put = OptionContract::put(100.0, d(5));
        pf.add(
            Position::open(TradeId(10_001), "AAA", Instrument::Option(short_put), 1.0, Side::Short, &day1)
                .unwrap(),
        );
        let entry = pf.positions()[1].entry_price();

        let expiry_day = snapshot(d(5), &[("AAA", 97.0)]);
        let settled = pf.settle_expiries(&expiry_day).unwrap();
        assert_eq!(settled.len(), 1);
        assert_eq!(settled[0].trade_id, TradeId(10_001));
        assert!((settled[0].realized_pnl - (entry - 3.0)).abs() < 1e-12);
        assert!(pf.get(TradeId(10_000)).unwrap().is_open());
    }
}
