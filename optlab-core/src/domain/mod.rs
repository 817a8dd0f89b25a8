//! Domain types for optlab: market snapshots, instruments, positions and the portfolio.

pub mod ids;
pub mod instrument;
pub mod portfolio;
pub mod position;
pub mod snapshot;

pub use ids::{IdAllocator, IdError, SequentialIds, SharedIdRegistry, TradeId, MAX_TRADE_ID, MIN_TRADE_ID};
pub use instrument::{AssetKind, Instrument, OptionContract, OptionKind, Side};
pub use portfolio::{ClosedTrade, Portfolio, PositionSummary};
pub use position::{Position, Valuation, ValuationError};
pub use snapshot::{EquityQuote, MarketData, MarketSnapshot, RateQuote, VolSurfaceData};

/// Symbol type alias
pub type Symbol = String;
