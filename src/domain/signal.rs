//! Trading signal generation from indicator columns.
//!
//! Signal generation never computes indicators itself. The series handed in
//! must already carry the columns the strategy needs, and each signal at
//! index `i` only reads rows `0..=i`.

use crate::domain::error::WalkforwardError;
use crate::domain::indicator::IndicatorKind;
use crate::domain::series::InstrumentSeries;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

impl Signal {
    pub fn as_i8(self) -> i8 {
        match self {
            Signal::Buy => 1,
            Signal::Sell => -1,
            Signal::Hold => 0,
        }
    }
}

/// A concrete strategy parameterization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StrategyParams {
    MaCross {
        short: usize,
        long: usize,
    },
    RsiThreshold {
        period: usize,
        oversold: f64,
        overbought: f64,
    },
}

impl StrategyParams {
    pub fn required_indicators(&self) -> Vec<IndicatorKind> {
        match *self {
            StrategyParams::MaCross { short, long } => {
                vec![IndicatorKind::Sma(short), IndicatorKind::Sma(long)]
            }
            StrategyParams::RsiThreshold { period, .. } => vec![IndicatorKind::Rsi(period)],
        }
    }
}

impl fmt::Display for StrategyParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            StrategyParams::MaCross { short, long } => {
                write!(f, "ma-cross short={} long={}", short, long)
            }
            StrategyParams::RsiThreshold {
                period,
                oversold,
                overbought,
            } => write!(
                f,
                "rsi period={} oversold={} overbought={}",
                period, oversold, overbought
            ),
        }
    }
}

/// A series paired with one signal per bar.
#[derive(Debug, Clone)]
pub struct SignalSeries {
    pub series: InstrumentSeries,
    pub signals: Vec<Signal>,
}

fn indicator_column<'a>(
    series: &'a InstrumentSeries,
    kind: IndicatorKind,
) -> Result<&'a [Option<f64>], WalkforwardError> {
    series
        .indicator(kind)
        .ok_or_else(|| WalkforwardError::MissingIndicator {
            indicator: kind.to_string(),
        })
}

/// Computes one signal per bar of `series` under `params`.
pub fn generate_signals(
    series: &InstrumentSeries,
    params: &StrategyParams,
) -> Result<SignalSeries, WalkforwardError> {
    let signals = match *params {
        StrategyParams::MaCross { short, long } => {
            let short_col = indicator_column(series, IndicatorKind::Sma(short))?;
            let long_col = indicator_column(series, IndicatorKind::Sma(long))?;
            ma_cross_signals(short_col, long_col)
        }
        StrategyParams::RsiThreshold {
            period,
            oversold,
            overbought,
        } => {
            let rsi_col = indicator_column(series, IndicatorKind::Rsi(period))?;
            rsi_signals(rsi_col, oversold, overbought)
        }
    };

    Ok(SignalSeries {
        series: series.clone(),
        signals,
    })
}

/// Buy when the short average crosses above the long average, sell on the
/// reverse crossing. A crossing needs both averages defined on the current
/// and previous row.
fn ma_cross_signals(short_col: &[Option<f64>], long_col: &[Option<f64>]) -> Vec<Signal> {
    let mut signals = Vec::with_capacity(short_col.len());
    for i in 0..short_col.len() {
        if i == 0 {
            signals.push(Signal::Hold);
            continue;
        }
        let signal = match (short_col[i - 1], long_col[i - 1], short_col[i], long_col[i]) {
            (Some(ps), Some(pl), Some(cs), Some(cl)) => {
                if ps <= pl && cs > cl {
                    Signal::Buy
                } else if ps >= pl && cs < cl {
                    Signal::Sell
                } else {
                    Signal::Hold
                }
            }
            _ => Signal::Hold,
        };
        signals.push(signal);
    }
    signals
}

/// Buy when RSI is at or below the oversold threshold, sell at or above the
/// overbought threshold.
fn rsi_signals(rsi_col: &[Option<f64>], oversold: f64, overbought: f64) -> Vec<Signal> {
    rsi_col
        .iter()
        .map(|value| match value {
            Some(rsi) if *rsi <= oversold => Signal::Buy,
            Some(rsi) if *rsi >= overbought => Signal::Sell,
            _ => Signal::Hold,
        })
        .collect()
}
