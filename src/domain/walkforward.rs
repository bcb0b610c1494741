//! Walk-forward orchestration: optimize on a trailing window, trade the
//! window that follows, step forward, stitch the results.

use crate::domain::error::WalkforwardError;
use crate::domain::optimizer::{self, ParameterGrid};
use crate::domain::series::InstrumentSeries;
use crate::domain::signal::{self, SignalSeries, StrategyParams};
use crate::domain::simulator::{self, AllocationMode, PortfolioSnapshot, SimulationConfig, TradeRecord};
use chrono::{Duration, NaiveDate};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy)]
pub struct WalkForwardConfig {
    pub optimization_window_days: i64,
    pub test_window_days: i64,
    pub step_days: i64,
    pub initial_cash: f64,
    pub leverage_ratio: f64,
    pub allocation: AllocationMode,
}

impl Default for WalkForwardConfig {
    fn default() -> Self {
        WalkForwardConfig {
            optimization_window_days: 180,
            test_window_days: 60,
            step_days: 30,
            initial_cash: 100_000.0,
            leverage_ratio: 1.0,
            allocation: AllocationMode::SingleOccupancy,
        }
    }
}

/// One optimization/test window pair. Both windows are half-open:
/// optimization covers `[optimization_start, optimization_end)` and the
/// test window covers `[test_start, test_end)`, with the test starting
/// the day after the optimization endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkForwardWindow {
    pub optimization_start: NaiveDate,
    pub optimization_end: NaiveDate,
    pub test_start: NaiveDate,
    pub test_end: NaiveDate,
}

impl WalkForwardWindow {
    pub fn at(start: NaiveDate, config: &WalkForwardConfig) -> Self {
        let optimization_end = start + Duration::days(config.optimization_window_days);
        let test_start = optimization_end + Duration::days(1);
        let test_end = test_start + Duration::days(config.test_window_days);
        WalkForwardWindow {
            optimization_start: start,
            optimization_end,
            test_start,
            test_end,
        }
    }
}

/// Outcome of one executed cycle.
#[derive(Debug, Clone)]
pub struct CycleResult {
    pub window: WalkForwardWindow,
    pub params: StrategyParams,
    pub final_value: f64,
    pub total_return: f64,
}

/// Stitched output of a full walk-forward run.
#[derive(Debug, Clone)]
pub struct WalkForwardReport {
    pub equity_curve: Vec<PortfolioSnapshot>,
    pub trades: Vec<TradeRecord>,
    pub cycles: Vec<CycleResult>,
}

fn data_range(instruments: &[InstrumentSeries]) -> Option<(NaiveDate, NaiveDate)> {
    let min = instruments.iter().filter_map(InstrumentSeries::first_date).min()?;
    let max = instruments.iter().filter_map(InstrumentSeries::last_date).max()?;
    Some((min, max))
}

/// Optimizes parameters on the first instrument with non-empty data in the
/// optimization window. Parameters are tuned on that one instrument and
/// applied uniformly across the test window; a richer per-instrument
/// search is deliberately not attempted.
fn optimize_window(
    instruments: &[InstrumentSeries],
    window: &WalkForwardWindow,
    grid: &ParameterGrid,
) -> Option<StrategyParams> {
    let representative = instruments
        .iter()
        .map(|instrument| {
            instrument.slice(window.optimization_start, window.optimization_end)
        })
        .find(|slice| !slice.is_empty());
    let Some(representative) = representative else {
        eprintln!(
            "warning: no optimization data in window starting {}",
            window.optimization_start
        );
        return None;
    };

    match optimizer::optimize(&representative, grid) {
        Ok(params) => Some(params),
        Err(err) => {
            eprintln!(
                "warning: skipping window starting {}: {}",
                window.optimization_start, err
            );
            None
        }
    }
}

/// Builds test-window signal series for the chosen parameters. Indicators
/// are computed on the test slice alone, so each cycle's warmup consumes
/// the head of its own test window.
fn test_signals(
    instruments: &[InstrumentSeries],
    window: &WalkForwardWindow,
    params: &StrategyParams,
) -> Result<Vec<SignalSeries>, WalkforwardError> {
    let mut inputs = Vec::new();
    for instrument in instruments {
        let slice = instrument
            .slice(window.test_start, window.test_end)
            .with_indicators(&params.required_indicators())
            .drop_warmup();
        if slice.is_empty() {
            eprintln!(
                "warning: {} has no tradable bars in test window starting {}",
                instrument.symbol, window.test_start
            );
            continue;
        }
        inputs.push(signal::generate_signals(&slice, params)?);
    }
    Ok(inputs)
}

/// Runs the full walk-forward loop and stitches the per-cycle results.
///
/// Each cycle trades with a fresh copy of the configured initial cash, so
/// cycle outcomes stay independent and comparable. Cycles that cannot
/// execute are skipped with a warning; a run where no cycle executes is an
/// error.
pub fn run_walk_forward(
    instruments: &[InstrumentSeries],
    grid: &ParameterGrid,
    config: &WalkForwardConfig,
) -> Result<WalkForwardReport, WalkforwardError> {
    let Some((min_date, max_date)) = data_range(instruments) else {
        return Err(WalkforwardError::Data {
            reason: "no instrument data loaded".into(),
        });
    };

    let sim_config = SimulationConfig {
        initial_cash: config.initial_cash,
        leverage_ratio: config.leverage_ratio,
        allocation: config.allocation,
    };

    let mut equity: BTreeMap<NaiveDate, PortfolioSnapshot> = BTreeMap::new();
    let mut trades = Vec::new();
    let mut cycles = Vec::new();

    let mut start = min_date;
    loop {
        let window = WalkForwardWindow::at(start, config);
        if window.optimization_end > max_date
            || window.test_start > max_date
            || window.test_start >= window.test_end
        {
            break;
        }
        start += Duration::days(config.step_days);

        let Some(params) = optimize_window(instruments, &window, grid) else {
            continue;
        };

        let inputs = test_signals(instruments, &window, &params)?;
        if inputs.is_empty() {
            eprintln!(
                "warning: no test signals for window starting {}",
                window.test_start
            );
            continue;
        }

        let result = match simulator::simulate(&inputs, &sim_config) {
            Ok(result) => result,
            Err(WalkforwardError::EmptyCalendar) => {
                eprintln!(
                    "warning: no common trading dates in test window starting {}",
                    window.test_start
                );
                continue;
            }
            Err(err) => return Err(err),
        };

        let final_value = result
            .snapshots
            .last()
            .map(|snapshot| snapshot.total_value)
            .unwrap_or(config.initial_cash);

        // Overlapping test windows re-simulate shared dates; the later
        // cycle's snapshot wins.
        for snapshot in result.snapshots {
            equity.insert(snapshot.date, snapshot);
        }
        trades.extend(result.trades);

        cycles.push(CycleResult {
            window,
            params,
            final_value,
            total_return: (final_value - config.initial_cash) / config.initial_cash,
        });
    }

    if cycles.is_empty() {
        return Err(WalkforwardError::NoSimulationPeriods);
    }

    Ok(WalkForwardReport {
        equity_curve: equity.into_values().collect(),
        trades,
        cycles,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::PriceBar;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn make_series(symbol: &str, start: NaiveDate, closes: &[f64]) -> InstrumentSeries {
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PriceBar {
                symbol: symbol.into(),
                date: start + Duration::days(i as i64),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1000,
            })
            .collect();
        InstrumentSeries::new(symbol, bars)
    }

    fn oscillating_closes(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 100.0 + 15.0 * ((i as f64) * 0.4).sin())
            .collect()
    }

    #[test]
    fn window_geometry() {
        let config = WalkForwardConfig {
            optimization_window_days: 180,
            test_window_days: 60,
            step_days: 30,
            ..WalkForwardConfig::default()
        };
        let window = WalkForwardWindow::at(date(2024, 1, 1), &config);
        assert_eq!(window.optimization_start, date(2024, 1, 1));
        assert_eq!(window.optimization_end, date(2024, 6, 29));
        assert_eq!(window.test_start, date(2024, 6, 30));
        assert_eq!(window.test_end, date(2024, 8, 29));
    }

    #[test]
    fn window_slices_exclude_their_end_dates() {
        // One cycle: test window [2024-02-11, 2024-03-02), so the last
        // tradable bar is 2024-03-01.
        let config = WalkForwardConfig {
            optimization_window_days: 40,
            test_window_days: 20,
            step_days: 365,
            ..WalkForwardConfig::default()
        };
        let series = make_series("A", date(2024, 1, 1), &oscillating_closes(70));
        let grid = ParameterGrid::MaCross {
            shorts: vec![2],
            longs: vec![5],
        };

        let report = run_walk_forward(&[series], &grid, &config).unwrap();
        assert_eq!(report.cycles.len(), 1);
        let window = report.cycles[0].window;
        for snapshot in &report.equity_curve {
            assert!(snapshot.date >= window.test_start);
            assert!(snapshot.date < window.test_end);
        }
        assert_eq!(report.equity_curve.last().unwrap().date, date(2024, 3, 1));
    }

    #[test]
    fn no_data_is_a_data_error() {
        let grid = ParameterGrid::MaCross {
            shorts: vec![2],
            longs: vec![5],
        };
        let err = run_walk_forward(&[], &grid, &WalkForwardConfig::default()).unwrap_err();
        assert!(matches!(err, WalkforwardError::Data { .. }));
    }

    #[test]
    fn too_little_data_for_one_window_is_no_simulation_periods() {
        let series = make_series("A", date(2024, 1, 1), &oscillating_closes(30));
        let grid = ParameterGrid::MaCross {
            shorts: vec![2],
            longs: vec![5],
        };
        let err = run_walk_forward(&[series], &grid, &WalkForwardConfig::default()).unwrap_err();
        assert!(matches!(err, WalkforwardError::NoSimulationPeriods));
    }

    #[test]
    fn cycles_advance_by_step_days() {
        let config = WalkForwardConfig {
            optimization_window_days: 40,
            test_window_days: 20,
            step_days: 10,
            ..WalkForwardConfig::default()
        };
        let series = make_series("A", date(2024, 1, 1), &oscillating_closes(120));
        let grid = ParameterGrid::MaCross {
            shorts: vec![2],
            longs: vec![5],
        };

        let report = run_walk_forward(&[series], &grid, &config).unwrap();
        assert!(report.cycles.len() > 1);
        for pair in report.cycles.windows(2) {
            let gap = pair[1].window.optimization_start - pair[0].window.optimization_start;
            assert_eq!(gap, Duration::days(10));
        }
    }

    #[test]
    fn equity_curve_is_sorted_and_deduplicated() {
        let config = WalkForwardConfig {
            optimization_window_days: 40,
            test_window_days: 30,
            step_days: 10,
            ..WalkForwardConfig::default()
        };
        let series = make_series("A", date(2024, 1, 1), &oscillating_closes(150));
        let grid = ParameterGrid::MaCross {
            shorts: vec![2],
            longs: vec![5],
        };

        let report = run_walk_forward(&[series], &grid, &config).unwrap();
        for pair in report.equity_curve.windows(2) {
            assert!(pair[0].date < pair[1].date);
        }
    }

    #[test]
    fn trades_are_appended_in_cycle_order() {
        let config = WalkForwardConfig {
            optimization_window_days: 40,
            test_window_days: 20,
            step_days: 20,
            ..WalkForwardConfig::default()
        };
        let series = make_series("A", date(2024, 1, 1), &oscillating_closes(150));
        let grid = ParameterGrid::MaCross {
            shorts: vec![2],
            longs: vec![5],
        };

        let report = run_walk_forward(&[series], &grid, &config).unwrap();
        // Within each cycle trades are date-ordered; across cycles the
        // ledger only ever appends, so each cycle's first trade is no
        // earlier than the previous cycle's first trade.
        let mut last_cycle_start: Option<NaiveDate> = None;
        for cycle in &report.cycles {
            if let Some(prev) = last_cycle_start {
                assert!(cycle.window.test_start > prev);
            }
            last_cycle_start = Some(cycle.window.test_start);
        }
        assert!(!report.trades.is_empty());
    }

    #[test]
    fn each_cycle_starts_from_fresh_cash() {
        let config = WalkForwardConfig {
            optimization_window_days: 40,
            test_window_days: 20,
            step_days: 20,
            initial_cash: 10_000.0,
            ..WalkForwardConfig::default()
        };
        let series = make_series("A", date(2024, 1, 1), &oscillating_closes(150));
        let grid = ParameterGrid::MaCross {
            shorts: vec![2],
            longs: vec![5],
        };

        let report = run_walk_forward(&[series], &grid, &config).unwrap();
        for cycle in &report.cycles {
            let expected = (cycle.final_value - 10_000.0) / 10_000.0;
            assert!((cycle.total_return - expected).abs() < 1e-12);
        }
    }
}
