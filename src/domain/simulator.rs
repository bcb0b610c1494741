//! Multi-instrument portfolio simulation over a common trading calendar.
//!
//! The simulation runs day by day over the intersection of all instruments'
//! dates. Within a day, sells execute before buys so freed capital is
//! available the same day. Positions are whole shares, entered only from
//! flat and exited only in full.

use crate::domain::error::WalkforwardError;
use crate::domain::signal::{Signal, SignalSeries};
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Cash comparisons tolerate this much float residue.
pub const CASH_EPSILON: f64 = 1e-9;

/// How buying power is shared when several instruments signal Buy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationMode {
    /// At most one position at a time. A buy only executes when no
    /// instrument holds a position, and the first flat buyer in caller
    /// order takes the full buying power.
    SingleOccupancy,
    /// Every flat buyer that day splits the buying power evenly;
    /// concurrent positions are allowed.
    EvenSplit,
}

#[derive(Debug, Clone, Copy)]
pub struct SimulationConfig {
    pub initial_cash: f64,
    pub leverage_ratio: f64,
    pub allocation: AllocationMode,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            initial_cash: 100_000.0,
            leverage_ratio: 1.0,
            allocation: AllocationMode::SingleOccupancy,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Position {
    pub shares: i64,
    pub average_cost: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeAction {
    Buy,
    Sell,
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeAction::Buy => write!(f, "BUY"),
            TradeAction::Sell => write!(f, "SELL"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TradeRecord {
    pub date: NaiveDate,
    pub symbol: String,
    pub action: TradeAction,
    pub price: f64,
    pub shares: i64,
    pub cash_remaining: f64,
    pub portfolio_value: f64,
    /// Realized profit on sells; buys carry no realization.
    pub realized_pnl: Option<f64>,
}

/// End-of-day portfolio state.
#[derive(Debug, Clone)]
pub struct PortfolioSnapshot {
    pub date: NaiveDate,
    pub cash: f64,
    pub holdings: Vec<(String, f64)>,
    pub total_value: f64,
}

#[derive(Debug, Clone)]
pub struct SimulationResult {
    pub snapshots: Vec<PortfolioSnapshot>,
    pub trades: Vec<TradeRecord>,
}

/// Dates shared by every instrument, ascending.
fn common_calendar(inputs: &[SignalSeries]) -> Vec<NaiveDate> {
    let mut iter = inputs.iter();
    let Some(first) = iter.next() else {
        return Vec::new();
    };

    let mut calendar: BTreeSet<NaiveDate> =
        first.series.bars.iter().map(|bar| bar.date).collect();
    for input in iter {
        let dates: BTreeSet<NaiveDate> = input.series.bars.iter().map(|bar| bar.date).collect();
        calendar = calendar.intersection(&dates).copied().collect();
    }
    calendar.into_iter().collect()
}

struct Instrument<'a> {
    input: &'a SignalSeries,
    by_date: HashMap<NaiveDate, usize>,
    position: Position,
}

impl<'a> Instrument<'a> {
    fn new(input: &'a SignalSeries) -> Self {
        let by_date = input
            .series
            .bars
            .iter()
            .enumerate()
            .map(|(i, bar)| (bar.date, i))
            .collect();
        Instrument {
            input,
            by_date,
            position: Position::default(),
        }
    }

    fn row(&self, date: NaiveDate) -> Option<(f64, Signal)> {
        self.by_date
            .get(&date)
            .map(|&i| (self.input.series.bars[i].close, self.input.signals[i]))
    }
}

fn mark_to_market(instruments: &[Instrument], date: NaiveDate, cash: f64) -> f64 {
    let holdings: f64 = instruments
        .iter()
        .filter(|inst| inst.position.shares > 0)
        .map(|inst| {
            let (close, _) = inst
                .row(date)
                .unwrap_or((inst.position.average_cost, Signal::Hold));
            inst.position.shares as f64 * close
        })
        .sum();
    cash + holdings
}

/// Replays `inputs` day by day under `config`.
pub fn simulate(
    inputs: &[SignalSeries],
    config: &SimulationConfig,
) -> Result<SimulationResult, WalkforwardError> {
    let calendar = common_calendar(inputs);
    if calendar.is_empty() {
        return Err(WalkforwardError::EmptyCalendar);
    }

    let mut instruments: Vec<Instrument> = inputs.iter().map(Instrument::new).collect();
    let mut cash = config.initial_cash;
    let mut trades = Vec::new();
    let mut snapshots = Vec::with_capacity(calendar.len());

    for &date in &calendar {
        // Sells first, freeing capital for buys on the same day.
        for inst in instruments.iter_mut() {
            let Some((close, signal)) = inst.row(date) else {
                continue;
            };
            if signal != Signal::Sell || inst.position.shares == 0 {
                continue;
            }

            let shares = inst.position.shares;
            let proceeds = shares as f64 * close / config.leverage_ratio;
            let realized = (close - inst.position.average_cost) * shares as f64;
            cash += proceeds;
            inst.position = Position::default();

            trades.push(TradeRecord {
                date,
                symbol: inst.input.series.symbol.clone(),
                action: TradeAction::Sell,
                price: close,
                shares,
                cash_remaining: cash,
                portfolio_value: 0.0,
                realized_pnl: Some(realized),
            });
        }

        // Buys.
        let any_position_held = instruments.iter().any(|inst| inst.position.shares > 0);
        let buyer_count = instruments
            .iter()
            .filter(|inst| {
                inst.position.shares == 0
                    && matches!(inst.row(date), Some((_, Signal::Buy)))
            })
            .count();

        if buyer_count > 0 {
            match config.allocation {
                AllocationMode::SingleOccupancy => {
                    if !any_position_held {
                        let power = cash * config.leverage_ratio;
                        for inst in instruments.iter_mut() {
                            let Some((close, Signal::Buy)) = inst.row(date) else {
                                continue;
                            };
                            // A buyer that cannot afford a whole share
                            // yields to the next signaling instrument.
                            let shares = (power / close).floor() as i64;
                            if shares <= 0 {
                                continue;
                            }
                            cash -= shares as f64 * close / config.leverage_ratio;
                            inst.position = Position {
                                shares,
                                average_cost: close,
                            };
                            trades.push(TradeRecord {
                                date,
                                symbol: inst.input.series.symbol.clone(),
                                action: TradeAction::Buy,
                                price: close,
                                shares,
                                cash_remaining: cash,
                                portfolio_value: 0.0,
                                realized_pnl: None,
                            });
                            break;
                        }
                    }
                }
                AllocationMode::EvenSplit => {
                    let per_buyer = cash * config.leverage_ratio / buyer_count as f64;
                    for inst in instruments.iter_mut() {
                        if inst.position.shares != 0 {
                            continue;
                        }
                        let Some((close, Signal::Buy)) = inst.row(date) else {
                            continue;
                        };
                        let shares = (per_buyer / close).floor() as i64;
                        if shares <= 0 {
                            continue;
                        }
                        cash -= shares as f64 * close / config.leverage_ratio;
                        inst.position = Position {
                            shares,
                            average_cost: close,
                        };
                        trades.push(TradeRecord {
                            date,
                            symbol: inst.input.series.symbol.clone(),
                            action: TradeAction::Buy,
                            price: close,
                            shares,
                            cash_remaining: cash,
                            portfolio_value: 0.0,
                            realized_pnl: None,
                        });
                    }
                }
            }
        }

        debug_assert!(cash > -CASH_EPSILON);

        let total_value = mark_to_market(&instruments, date, cash);
        for trade in trades.iter_mut().rev() {
            if trade.date != date {
                break;
            }
            trade.portfolio_value = total_value;
        }

        let holdings = instruments
            .iter()
            .filter(|inst| inst.position.shares > 0)
            .map(|inst| {
                let (close, _) = inst
                    .row(date)
                    .unwrap_or((inst.position.average_cost, Signal::Hold));
                (
                    inst.input.series.symbol.clone(),
                    inst.position.shares as f64 * close,
                )
            })
            .collect();

        snapshots.push(PortfolioSnapshot {
            date,
            cash,
            holdings,
            total_value,
        });
    }

    Ok(SimulationResult { snapshots, trades })
}
