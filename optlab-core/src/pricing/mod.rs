//! Option valuation: volatility surface interpolation and analytic BSM pricing.

pub mod black_scholes;
pub mod surface;

pub use black_scholes::{year_fraction, BlackScholesMerton, PricingError, DAYS_PER_YEAR};
pub use surface::{SurfaceError, VolSurface};
