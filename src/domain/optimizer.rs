//! Grid-search parameter optimization over a single trailing window.
//!
//! Each candidate parameterization is scored by replaying its signals with a
//! simplified single-instrument simulation: fixed fictitious starting cash,
//! no leverage, full-in on buy and full-out on sell. Candidate order is
//! deterministic and ties keep the first-seen candidate.

use crate::domain::error::WalkforwardError;
use crate::domain::series::InstrumentSeries;
use crate::domain::signal::{self, Signal, StrategyParams};

/// Fictitious cash used only for scoring candidates; the real simulation
/// uses the configured initial cash.
pub const SIMPLIFIED_STARTING_CASH: f64 = 1_000_000.0;

/// The parameter space searched for one strategy family.
#[derive(Debug, Clone)]
pub enum ParameterGrid {
    MaCross {
        shorts: Vec<usize>,
        longs: Vec<usize>,
    },
    RsiThreshold {
        periods: Vec<usize>,
        oversolds: Vec<f64>,
        overboughts: Vec<f64>,
    },
}

impl ParameterGrid {
    /// Enumerates valid candidates in a fixed order. Degenerate combinations
    /// (short >= long, oversold >= overbought) are skipped.
    pub fn candidates(&self) -> Vec<StrategyParams> {
        let mut out = Vec::new();
        match self {
            ParameterGrid::MaCross { shorts, longs } => {
                for &short in shorts {
                    for &long in longs {
                        if short >= long {
                            continue;
                        }
                        out.push(StrategyParams::MaCross { short, long });
                    }
                }
            }
            ParameterGrid::RsiThreshold {
                periods,
                oversolds,
                overboughts,
            } => {
                for &period in periods {
                    for &oversold in oversolds {
                        for &overbought in overboughts {
                            if oversold >= overbought {
                                continue;
                            }
                            out.push(StrategyParams::RsiThreshold {
                                period,
                                oversold,
                                overbought,
                            });
                        }
                    }
                }
            }
        }
        out
    }
}

/// Scores one candidate on `series`. Returns `None` when the candidate's
/// warmup consumes the whole window, leaving nothing to replay.
fn simplified_return(
    series: &InstrumentSeries,
    params: &StrategyParams,
) -> Result<Option<f64>, WalkforwardError> {
    let prepared = series
        .with_indicators(&params.required_indicators())
        .drop_warmup();
    if prepared.is_empty() {
        return Ok(None);
    }

    let signals = signal::generate_signals(&prepared, params)?;

    let mut cash = SIMPLIFIED_STARTING_CASH;
    let mut shares: i64 = 0;
    for (bar, sig) in prepared.bars.iter().zip(&signals.signals) {
        match sig {
            Signal::Buy if shares == 0 => {
                let bought = (cash / bar.close).floor() as i64;
                if bought > 0 {
                    shares = bought;
                    cash -= bought as f64 * bar.close;
                }
            }
            Signal::Sell if shares > 0 => {
                cash += shares as f64 * bar.close;
                shares = 0;
            }
            _ => {}
        }
    }

    let last_close = prepared.bars.last().map(|bar| bar.close).unwrap_or(0.0);
    let final_value = cash + shares as f64 * last_close;
    Ok(Some(
        (final_value - SIMPLIFIED_STARTING_CASH) / SIMPLIFIED_STARTING_CASH,
    ))
}

/// Picks the candidate with the highest simplified return on `series`.
pub fn optimize(
    series: &InstrumentSeries,
    grid: &ParameterGrid,
) -> Result<StrategyParams, WalkforwardError> {
    if series.is_empty() {
        return Err(WalkforwardError::InsufficientData {
            symbol: series.symbol.clone(),
            reason: "optimization window contains no bars".into(),
        });
    }

    let mut best: Option<(StrategyParams, f64)> = None;
    for params in grid.candidates() {
        let Some(score) = simplified_return(series, &params)? else {
            continue;
        };
        // Strictly greater, so the first candidate to reach a score wins
        // ties and the search order stays observable.
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((params, score)),
        }
    }

    match best {
        Some((params, _)) => Ok(params),
        None => Err(WalkforwardError::InsufficientData {
            symbol: series.symbol.clone(),
            reason: "no parameter candidate survived indicator warmup".into(),
        }),
    }
}
