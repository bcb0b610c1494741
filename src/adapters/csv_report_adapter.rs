//! CSV report adapter.
//!
//! Writes three files into the output directory: `equity_curve.csv` with
//! the stitched daily portfolio values, `trades.csv` with the full trade
//! ledger, and `summary.csv` with the headline run numbers.

use crate::domain::error::WalkforwardError;
use crate::domain::metrics::RunSummary;
use crate::domain::walkforward::WalkForwardReport;
use crate::ports::report_port::ReportPort;
use std::fs;
use std::path::Path;

pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CsvReportAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn csv_error(context: &str, err: csv::Error) -> WalkforwardError {
    WalkforwardError::Data {
        reason: format!("failed to write {}: {}", context, err),
    }
}

impl ReportPort for CsvReportAdapter {
    fn write(
        &self,
        report: &WalkForwardReport,
        summary: &RunSummary,
        output_dir: &Path,
    ) -> Result<(), WalkforwardError> {
        fs::create_dir_all(output_dir)?;

        let equity_path = output_dir.join("equity_curve.csv");
        let mut wtr = csv::Writer::from_path(&equity_path)
            .map_err(|e| csv_error("equity_curve.csv", e))?;
        wtr.write_record(["date", "cash", "total_value"])
            .map_err(|e| csv_error("equity_curve.csv", e))?;
        for snapshot in &report.equity_curve {
            wtr.write_record([
                snapshot.date.to_string(),
                format!("{:.2}", snapshot.cash),
                format!("{:.2}", snapshot.total_value),
            ])
            .map_err(|e| csv_error("equity_curve.csv", e))?;
        }
        wtr.flush()?;

        let trades_path = output_dir.join("trades.csv");
        let mut wtr =
            csv::Writer::from_path(&trades_path).map_err(|e| csv_error("trades.csv", e))?;
        wtr.write_record([
            "date",
            "symbol",
            "action",
            "price",
            "shares",
            "cash_remaining",
            "portfolio_value",
            "realized_pnl",
        ])
        .map_err(|e| csv_error("trades.csv", e))?;
        for trade in &report.trades {
            wtr.write_record([
                trade.date.to_string(),
                trade.symbol.clone(),
                trade.action.to_string(),
                format!("{:.4}", trade.price),
                trade.shares.to_string(),
                format!("{:.2}", trade.cash_remaining),
                format!("{:.2}", trade.portfolio_value),
                trade
                    .realized_pnl
                    .map(|pnl| format!("{:.2}", pnl))
                    .unwrap_or_default(),
            ])
            .map_err(|e| csv_error("trades.csv", e))?;
        }
        wtr.flush()?;

        let summary_path = output_dir.join("summary.csv");
        let mut wtr =
            csv::Writer::from_path(&summary_path).map_err(|e| csv_error("summary.csv", e))?;
        wtr.write_record(["metric", "value"])
            .map_err(|e| csv_error("summary.csv", e))?;
        let rows = [
            ("initial_cash", format!("{:.2}", summary.initial_cash)),
            ("final_value", format!("{:.2}", summary.final_value)),
            ("total_return", format!("{:.6}", summary.total_return)),
            (
                "buy_and_hold_return",
                summary
                    .buy_and_hold_return
                    .map(|r| format!("{:.6}", r))
                    .unwrap_or_default(),
            ),
            ("max_drawdown", format!("{:.6}", summary.max_drawdown)),
            ("total_trades", summary.total_trades.to_string()),
        ];
        for (metric, value) in rows {
            wtr.write_record([metric.to_string(), value])
                .map_err(|e| csv_error("summary.csv", e))?;
        }
        wtr.flush()?;

        Ok(())
    }
}
