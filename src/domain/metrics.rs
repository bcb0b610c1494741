//! Summary statistics over a stitched walk-forward run.

use crate::domain::series::InstrumentSeries;
use crate::domain::simulator::PortfolioSnapshot;
use crate::domain::walkforward::WalkForwardReport;
use chrono::Duration;

/// Headline numbers for a completed run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub initial_cash: f64,
    pub final_value: f64,
    pub total_return: f64,
    /// Return of holding the reference instrument across the same span,
    /// when a reference is available.
    pub buy_and_hold_return: Option<f64>,
    pub max_drawdown: f64,
    pub total_trades: usize,
}

/// Largest peak-to-trough decline as a fraction of the peak. Zero for a
/// monotonically rising or empty curve.
pub fn max_drawdown(snapshots: &[PortfolioSnapshot]) -> f64 {
    let mut peak = f64::MIN;
    let mut worst = 0.0;
    for snapshot in snapshots {
        if snapshot.total_value > peak {
            peak = snapshot.total_value;
        }
        if peak > 0.0 {
            let drawdown = (peak - snapshot.total_value) / peak;
            if drawdown > worst {
                worst = drawdown;
            }
        }
    }
    worst
}

fn buy_and_hold_return(
    reference: &InstrumentSeries,
    snapshots: &[PortfolioSnapshot],
) -> Option<f64> {
    let first_date = snapshots.first()?.date;
    let last_date = snapshots.last()?.date;
    let span = reference.slice(first_date, last_date + Duration::days(1));
    let first_close = span.bars.first()?.close;
    let last_close = span.bars.last()?.close;
    if first_close <= 0.0 {
        return None;
    }
    Some((last_close - first_close) / first_close)
}

pub fn compute(
    report: &WalkForwardReport,
    initial_cash: f64,
    reference: Option<&InstrumentSeries>,
) -> RunSummary {
    let final_value = report
        .equity_curve
        .last()
        .map(|snapshot| snapshot.total_value)
        .unwrap_or(initial_cash);

    RunSummary {
        initial_cash,
        final_value,
        total_return: (final_value - initial_cash) / initial_cash,
        buy_and_hold_return: reference
            .and_then(|series| buy_and_hold_return(series, &report.equity_curve)),
        max_drawdown: max_drawdown(&report.equity_curve),
        total_trades: report.trades.len(),
    }
}
