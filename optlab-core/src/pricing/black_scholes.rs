//! Closed-form Black-Scholes-Merton pricing for European vanilla options.
//!
//! Flat risk-free rate, flat continuous dividend yield and flat volatility.
//! Time is measured in years on an Actual/365 Fixed basis.

use chrono::NaiveDate;
use statrs::function::erf::erfc;
use std::f64::consts::SQRT_2;
use thiserror::Error;

use crate::domain::OptionKind;

/// Days per year for the Actual/365 Fixed day count.
pub const DAYS_PER_YEAR: f64 = 365.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PricingError {
    #[error("spot must be positive and finite, got {0}")]
    InvalidSpot(f64),

    #[error("strike must be positive and finite, got {0}")]
    InvalidStrike(f64),

    #[error("volatility must be positive and finite, got {0}")]
    InvalidVolatility(f64),

    #[error("non-finite {name}: {value}")]
    NonFinite { name: &'static str, value: f64 },
}

/// Year fraction between two dates, Actual/365 Fixed.
pub fn year_fraction(from: NaiveDate, to: NaiveDate) -> f64 {
    (to - from).num_days() as f64 / DAYS_PER_YEAR
}

/// Standard normal CDF.
fn norm_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / SQRT_2)
}

/// Analytic European engine for a BSM process with flat curves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlackScholesMerton {
    /// Risk-free rate
    pub rate: f64,
    /// Dividend yield
    pub dividend: f64,
}

impl BlackScholesMerton {
    pub fn new(rate: f64, dividend: f64) -> Self {
        Self { rate, dividend }
    }

    fn d1(&self, spot: f64, strike: f64, time: f64, vol: f64) -> f64 {
        let numerator =
            (spot / strike).ln() + (self.rate - self.dividend + 0.5 * vol * vol) * time;
        numerator / (vol * time.sqrt())
    }

    /// Option value. With `time <= 0` the option has expired and is worth its
    /// intrinsic payoff.
    pub fn price(
        &self,
        spot: f64,
        strike: f64,
        time: f64,
        vol: f64,
        kind: OptionKind,
    ) -> Result<f64, PricingError> {
        if !(spot.is_finite() && spot > 0.0) {
            return Err(PricingError::InvalidSpot(spot));
        }
        if !(strike.is_finite() && strike > 0.0) {
            return Err(PricingError::InvalidStrike(strike));
        }
        if !time.is_finite() {
            return Err(PricingError::NonFinite { name: "time", value: time });
        }
        if time <= 0.0 {
            return Ok(kind.payoff(spot, strike));
        }
        if !(vol.is_finite() && vol > 0.0) {
            return Err(PricingError::InvalidVolatility(vol));
        }
        for (name, value) in [("rate", self.rate), ("dividend", self.dividend)] {
            if !value.is_finite() {
                return Err(PricingError::NonFinite { name, value });
            }
        }

        let d1 = self.d1(spot, strike, time, vol);
        let d2 = d1 - vol * time.sqrt();
        let spot_df = (-self.dividend * time).exp();
        let strike_df = (-self.rate * time).exp();

        let value = match kind {
            OptionKind::Call => {
                spot * spot_df * norm_cdf(d1) - strike * strike_df * norm_cdf(d2)
            }
            OptionKind::Put => {
                strike * strike_df * norm_cdf(-d2) - spot * spot_df * norm_cdf(-d1)
            }
        };
        Ok(value)
    }
}
