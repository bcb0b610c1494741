//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::config_validation::{
    parse_f64_list, parse_usize_list, validate_run_config,
};
use crate::domain::error::WalkforwardError;
use crate::domain::metrics;
use crate::domain::optimizer::ParameterGrid;
use crate::domain::series::InstrumentSeries;
use crate::domain::simulator::AllocationMode;
use crate::domain::walkforward::{self, WalkForwardConfig};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "walkforward", about = "Walk-forward trading strategy backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a walk-forward backtest
    Run {
        #[arg(short, long)]
        config: PathBuf,
        /// Override the data directory from the config
        #[arg(short, long)]
        data: Option<PathBuf>,
        /// Directory for the report files
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Override the symbol list from the config
        #[arg(long)]
        symbols: Option<String>,
    },
    /// Validate a run configuration
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show the data range for every symbol in a data directory
    Info {
        #[arg(short, long)]
        data: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Run {
            config,
            data,
            output,
            symbols,
        } => run_backtest(&config, data.as_ref(), output.as_ref(), symbols.as_deref()),
        Command::Validate { config } => run_validate(&config),
        Command::Info { data } => run_info(&data),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = WalkforwardError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

pub fn parse_symbols(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn build_walkforward_config(
    adapter: &dyn ConfigPort,
) -> Result<WalkForwardConfig, WalkforwardError> {
    let allocation = match adapter
        .get_string("backtest", "allocation")
        .unwrap_or_else(|| "single".to_string())
        .trim()
    {
        "even-split" => AllocationMode::EvenSplit,
        _ => AllocationMode::SingleOccupancy,
    };

    Ok(WalkForwardConfig {
        optimization_window_days: adapter.get_int(
            "walkforward",
            "optimization_window_days",
            180,
        ),
        test_window_days: adapter.get_int("walkforward", "test_window_days", 60),
        step_days: adapter.get_int("walkforward", "step_days", 30),
        initial_cash: adapter.get_double("backtest", "initial_cash", 100_000.0),
        leverage_ratio: adapter.get_double("backtest", "leverage_ratio", 1.0),
        allocation,
    })
}

pub fn build_grid(adapter: &dyn ConfigPort) -> Result<ParameterGrid, WalkforwardError> {
    let list = |key: &str, default: &str| -> Result<Vec<usize>, WalkforwardError> {
        let value = adapter
            .get_string("strategy", key)
            .unwrap_or_else(|| default.to_string());
        parse_usize_list(&value).map_err(|reason| WalkforwardError::ConfigInvalid {
            section: "strategy".to_string(),
            key: key.to_string(),
            reason,
        })
    };
    let levels = |key: &str, default: &str| -> Result<Vec<f64>, WalkforwardError> {
        let value = adapter
            .get_string("strategy", key)
            .unwrap_or_else(|| default.to_string());
        parse_f64_list(&value).map_err(|reason| WalkforwardError::ConfigInvalid {
            section: "strategy".to_string(),
            key: key.to_string(),
            reason,
        })
    };

    let kind = adapter
        .get_string("strategy", "kind")
        .unwrap_or_else(|| "ma-cross".to_string());
    match kind.trim() {
        "rsi" => Ok(ParameterGrid::RsiThreshold {
            periods: list("rsi_periods", "14")?,
            oversolds: levels("oversold_levels", "30")?,
            overboughts: levels("overbought_levels", "70")?,
        }),
        _ => Ok(ParameterGrid::MaCross {
            shorts: list("short_periods", "5,10,15,20,25")?,
            longs: list("long_periods", "10,20,30,40,50,60")?,
        }),
    }
}

fn configured_date(
    adapter: &dyn ConfigPort,
    key: &str,
    default: NaiveDate,
) -> Result<NaiveDate, WalkforwardError> {
    match adapter.get_string("data", key) {
        None => Ok(default),
        Some(value) => {
            NaiveDate::parse_from_str(&value, "%Y-%m-%d").map_err(|_| {
                WalkforwardError::ConfigInvalid {
                    section: "data".into(),
                    key: key.to_string(),
                    reason: "invalid date format (expected YYYY-MM-DD)".into(),
                }
            })
        }
    }
}

fn run_backtest(
    config_path: &PathBuf,
    data_override: Option<&PathBuf>,
    output_override: Option<&PathBuf>,
    symbols_override: Option<&str>,
) -> ExitCode {
    // Stage 1: Load and validate config
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    if let Err(e) = validate_run_config(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    // Stage 2: Resolve run settings
    let wf_config = match build_walkforward_config(&adapter) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let grid = match build_grid(&adapter) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let symbols = match symbols_override {
        Some(s) => parse_symbols(s),
        None => parse_symbols(&adapter.get_string("data", "symbols").unwrap_or_default()),
    };
    if symbols.is_empty() {
        eprintln!("error: no symbols configured");
        return ExitCode::from(2);
    }

    let data_path = data_override.cloned().unwrap_or_else(|| {
        PathBuf::from(adapter.get_string("data", "path").unwrap_or_default())
    });

    let start_date = match configured_date(&adapter, "start_date", NaiveDate::MIN) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let end_date = match configured_date(&adapter, "end_date", NaiveDate::MAX) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    // Stage 3: Load instrument data
    eprintln!("Loading {} symbols from {}", symbols.len(), data_path.display());
    let data_port = CsvAdapter::new(data_path);
    let mut instruments: Vec<InstrumentSeries> = Vec::with_capacity(symbols.len());
    for symbol in &symbols {
        match data_port.fetch_bars(symbol, start_date, end_date) {
            Ok(bars) if bars.is_empty() => {
                eprintln!("warning: skipping {} (no bars in range)", symbol);
            }
            Ok(bars) => instruments.push(InstrumentSeries::new(symbol.clone(), bars)),
            Err(e) => {
                eprintln!("warning: skipping {} ({})", symbol, e);
            }
        }
    }
    if instruments.is_empty() {
        eprintln!("error: no valid symbols with data to backtest");
        return ExitCode::from(5);
    }

    // Stage 4: Walk forward
    eprintln!(
        "Running walk-forward: {} instruments, opt {}d / test {}d / step {}d",
        instruments.len(),
        wf_config.optimization_window_days,
        wf_config.test_window_days,
        wf_config.step_days,
    );
    let report = match walkforward::run_walk_forward(&instruments, &grid, &wf_config) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    // Stage 5: Summary to stderr
    let summary = metrics::compute(&report, wf_config.initial_cash, instruments.first());
    eprintln!("\n=== Walk-Forward Results ===");
    eprintln!("Cycles:           {}", report.cycles.len());
    eprintln!("Final Value:      {:.2}", summary.final_value);
    eprintln!("Total Return:     {:.2}%", summary.total_return * 100.0);
    if let Some(bh) = summary.buy_and_hold_return {
        eprintln!("Buy & Hold:       {:.2}%", bh * 100.0);
    }
    eprintln!("Max Drawdown:     -{:.1}%", summary.max_drawdown * 100.0);
    eprintln!("Total Trades:     {}", summary.total_trades);

    eprintln!("\n=== Per-Cycle Summary ===");
    for cycle in &report.cycles {
        eprintln!(
            "  {} to {}:  {:+.2}%  ({})",
            cycle.window.test_start,
            cycle.window.test_end,
            cycle.total_return * 100.0,
            cycle.params,
        );
    }

    // Stage 6: Write reports
    let output_dir = output_override.cloned().unwrap_or_else(|| {
        PathBuf::from(
            adapter
                .get_string("report", "output_dir")
                .unwrap_or_else(|| "reports".to_string()),
        )
    });
    let report_port = CsvReportAdapter::new();
    match report_port.write(&report, &summary, &output_dir) {
        Ok(()) => {
            eprintln!("\nReports written to: {}", output_dir.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    if let Err(e) = validate_run_config(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }
    if let Err(e) = build_grid(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }
    eprintln!("Config validated successfully");
    ExitCode::SUCCESS
}

fn run_info(data_path: &PathBuf) -> ExitCode {
    let data_port = CsvAdapter::new(data_path.clone());
    let symbols = match data_port.list_symbols() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    if symbols.is_empty() {
        eprintln!("No CSV files found in {}", data_path.display());
        return ExitCode::SUCCESS;
    }

    for symbol in &symbols {
        match data_port.data_range(symbol) {
            Ok(Some((first, last, count))) => {
                eprintln!("  {}:  {} to {} ({} bars)", symbol, first, last, count);
            }
            Ok(None) => {
                eprintln!("  {}:  no data", symbol);
            }
            Err(e) => {
                eprintln!("  {}:  error ({})", symbol, e);
            }
        }
    }
    ExitCode::SUCCESS
}
