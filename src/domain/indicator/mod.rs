//! Technical indicator implementations.
//!
//! Indicators are pure functions of bars and an explicit period. Output
//! columns are aligned index-for-index with the input bars, `None` while
//! the indicator is still warming up.

pub mod rsi;
pub mod sma;

use crate::domain::ohlcv::PriceBar;
use std::fmt;

/// Indicator identity + parameters. Serves as the column key on a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorKind {
    Sma(usize),
    Rsi(usize),
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorKind::Sma(period) => write!(f, "SMA({})", period),
            IndicatorKind::Rsi(period) => write!(f, "RSI({})", period),
        }
    }
}

pub fn compute(kind: IndicatorKind, bars: &[PriceBar]) -> Vec<Option<f64>> {
    match kind {
        IndicatorKind::Sma(period) => sma::calculate_sma(bars, period),
        IndicatorKind::Rsi(period) => rsi::calculate_rsi(bars, period),
    }
}
