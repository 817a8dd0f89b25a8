//! Implied-volatility surface over a (moneyness × tenor) grid.
//!
//! Queries are answered by bilinear interpolation on the regular grid. Outside
//! the grid the edge cell's linear trend is extended, so a query never fails
//! just because it falls off the grid. A query that lands on a node returns
//! the stored value bit-for-bit.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::VolSurfaceData;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SurfaceError {
    #[error("{axis} axis is empty")]
    EmptyAxis { axis: &'static str },

    #[error("{axis} axis is not strictly increasing at index {index}")]
    NotIncreasing { axis: &'static str, index: usize },

    #[error("volatility grid shape mismatch: expected {rows}x{cols}, row {row} has {found} columns")]
    ShapeMismatch { rows: usize, cols: usize, row: usize, found: usize },

    #[error("volatility grid has {found} rows, moneyness axis has {expected}")]
    RowCountMismatch { expected: usize, found: usize },

    #[error("non-finite value in {what} at index {index}")]
    NonFinite { what: &'static str, index: usize },

    #[error("invalid query point (moneyness={moneyness}, tenor={tenor})")]
    InvalidQuery { moneyness: f64, tenor: f64 },
}

/// Validated volatility grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolSurface {
    moneyness: Vec<f64>,
    tenors: Vec<f64>,
    /// `vols[i][j]` at `moneyness[i]`, `tenors[j]`.
    vols: Vec<Vec<f64>>,
}

impl VolSurface {
    pub fn new(
        moneyness: Vec<f64>,
        tenors: Vec<f64>,
        vols: Vec<Vec<f64>>,
    ) -> Result<Self, SurfaceError> {
        validate_axis("moneyness", &moneyness)?;
        validate_axis("tenor", &tenors)?;

        if vols.len() != moneyness.len() {
            return Err(SurfaceError::RowCountMismatch {
                expected: moneyness.len(),
                found: vols.len(),
            });
        }
        for (row, values) in vols.iter().enumerate() {
            if values.len() != tenors.len() {
                return Err(SurfaceError::ShapeMismatch {
                    rows: moneyness.len(),
                    cols: tenors.len(),
                    row,
                    found: values.len(),
                });
            }
            if let Some(col) = values.iter().position(|v| !v.is_finite()) {
                return Err(SurfaceError::NonFinite {
                    what: "volatility grid",
                    index: row * tenors.len() + col,
                });
            }
        }

        Ok(Self { moneyness, tenors, vols })
    }

    /// Build from the raw snapshot layout (tenors in whole days).
    pub fn from_data(data: &VolSurfaceData) -> Result<Self, SurfaceError> {
        Self::new(
            data.moneyness.clone(),
            data.tenor.iter().map(|&t| t as f64).collect(),
            data.volatility.clone(),
        )
    }

    pub fn moneyness(&self) -> &[f64] {
        &self.moneyness
    }

    pub fn tenors(&self) -> &[f64] {
        &self.tenors
    }

    /// Interpolated volatility at (`moneyness`, `tenor_days`).
    pub fn vol(&self, moneyness: f64, tenor_days: f64) -> Result<f64, SurfaceError> {
        if !moneyness.is_finite() || !tenor_days.is_finite() {
            return Err(SurfaceError::InvalidQuery { moneyness, tenor: tenor_days });
        }

        let (i, wm) = bracket(&self.moneyness, moneyness);
        let (j, wt) = bracket(&self.tenors, tenor_days);
        let i1 = (i + 1).min(self.moneyness.len() - 1);
        let j1 = (j + 1).min(self.tenors.len() - 1);

        // Skip zero-weight corners so node queries are exact.
        let mut vol = 0.0;
        for (row, w_row) in [(i, 1.0 - wm), (i1, wm)] {
            if w_row == 0.0 {
                continue;
            }
            for (col, w_col) in [(j, 1.0 - wt), (j1, wt)] {
                if w_col == 0.0 {
                    continue;
                }
                vol += w_row * w_col * self.vols[row][col];
            }
        }
        Ok(vol)
    }

    /// Volatility for an option struck at `strike` when the underlying trades
    /// at `spot`, `days` calendar days before expiry.
    pub fn vol_for_strike(&self, strike: f64, spot: f64, days: f64) -> Result<f64, SurfaceError> {
        self.vol(strike / spot, days)
    }
}

fn validate_axis(axis: &'static str, values: &[f64]) -> Result<(), SurfaceError> {
    if values.is_empty() {
        return Err(SurfaceError::EmptyAxis { axis });
    }
    if let Some(index) = values.iter().position(|v| !v.is_finite()) {
        return Err(SurfaceError::NonFinite { what: axis, index });
    }
    if let Some(index) = values.windows(2).position(|w| w[1] <= w[0]) {
        return Err(SurfaceError::NotIncreasing { axis, index: index + 1 });
    }
    Ok(())
}

/// Lower cell index and fractional weight of `x` on `axis`.
///
/// The weight lies in `[0, 1]` inside the grid and outside it when the
/// query is extrapolated from the first or last cell.
fn bracket(axis: &[f64], x: f64) -> (usize, f64) {
    if axis.len() == 1 {
        return (0, 0.0);
    }
    let last_cell = axis.len() - 2;
    let i = axis
        .partition_point(|&node| node <= x)
        .saturating_sub(1)
        .min(last_cell);
    let weight = (x - axis[i]) / (axis[i + 1] - axis[i]);
    (i, weight)
}
