//! Price statistics shared by the outlier flag and the analytics reports.

use polars::prelude::*;

use crate::error::Result;

const IQR_MULTIPLIER: f64 = 1.5;

/// Quartile bounds derived from the non-null prices of a table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IqrBounds {
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub upper: f64,
}

impl IqrBounds {
    /// Linear-interpolated quartiles over the non-null values. `None` when no
    /// value is present.
    pub fn from_prices(prices: &Float64Chunked) -> Result<Option<Self>> {
        let q1 = prices.quantile(0.25, QuantileMethod::Linear)?;
        let q3 = prices.quantile(0.75, QuantileMethod::Linear)?;
        let (Some(q1), Some(q3)) = (q1, q3) else {
            return Ok(None);
        };

        let iqr = q3 - q1;
        Ok(Some(Self {
            q1,
            q3,
            iqr,
            upper: q3 + IQR_MULTIPLIER * iqr,
        }))
    }

    pub fn is_extreme(&self, price: f64) -> bool {
        price < self.q1 || price > self.upper
    }
}

/// Two decimal places, ties to even.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prices(values: &[Option<f64>]) -> Float64Chunked {
        Float64Chunked::from_iter_options("price".into(), values.iter().copied())
    }

    #[test]
    fn bounds_follow_tukey_fence() {
        let prices = prices(&[Some(10.0), Some(12.0), None, Some(11.0), Some(13.0), Some(1000.0)]);
        let bounds = IqrBounds::from_prices(&prices)
            .expect("quantiles")
            .expect("bounds");
        assert_eq!(bounds.q1, 11.0);
        assert_eq!(bounds.q3, 13.0);
        assert_eq!(bounds.iqr, 2.0);
        assert_eq!(bounds.upper, 16.0);
        assert!(bounds.is_extreme(10.0));
        assert!(!bounds.is_extreme(16.0));
    }

    #[test]
    fn bounds_interpolate_between_ranks() {
        let prices = prices(&[Some(4.0), Some(1.0), Some(3.0), Some(2.0)]);
        let bounds = IqrBounds::from_prices(&prices)
            .expect("quantiles")
            .expect("bounds");
        assert_eq!(bounds.q1, 1.75);
        assert_eq!(bounds.q3, 3.25);
    }

    #[test]
    fn no_bounds_without_values() {
        assert_eq!(IqrBounds::from_prices(&prices(&[None, None])).expect("quantiles"), None);
        assert_eq!(IqrBounds::from_prices(&prices(&[])).expect("quantiles"), None);
    }

    #[test]
    fn round2_breaks_ties_to_even() {
        assert_eq!(round2(2.345_678), 2.35);
        assert_eq!(round2(0.125), 0.12);
        assert_eq!(round2(0.375), 0.38);
        assert_eq!(round2(30.125), 30.12);
    }
}
