//! Configuration validation.
//!
//! Validates all config fields before a walk-forward run starts, so bad
//! values fail fast instead of mid-run.

use crate::domain::error::WalkforwardError;
use crate::ports::config_port::ConfigPort;

pub fn validate_run_config(config: &dyn ConfigPort) -> Result<(), WalkforwardError> {
    validate_data_section(config)?;
    validate_initial_cash(config)?;
    validate_leverage_ratio(config)?;
    validate_allocation(config)?;
    validate_windows(config)?;
    validate_strategy_section(config)?;
    Ok(())
}

fn validate_data_section(config: &dyn ConfigPort) -> Result<(), WalkforwardError> {
    match config.get_string("data", "path") {
        Some(s) if !s.trim().is_empty() => {}
        _ => {
            return Err(WalkforwardError::ConfigMissing {
                section: "data".to_string(),
                key: "path".to_string(),
            })
        }
    }

    match config.get_string("data", "symbols") {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(WalkforwardError::ConfigMissing {
            section: "data".to_string(),
            key: "symbols".to_string(),
        }),
    }
}

fn validate_initial_cash(config: &dyn ConfigPort) -> Result<(), WalkforwardError> {
    let value = config.get_double("backtest", "initial_cash", 100_000.0);
    if value <= 0.0 {
        return Err(WalkforwardError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "initial_cash".to_string(),
            reason: "initial_cash must be positive".to_string(),
        });
    }
    Ok(())
}

fn validate_leverage_ratio(config: &dyn ConfigPort) -> Result<(), WalkforwardError> {
    let value = config.get_double("backtest", "leverage_ratio", 1.0);
    if value < 1.0 {
        return Err(WalkforwardError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "leverage_ratio".to_string(),
            reason: "leverage_ratio must be at least 1".to_string(),
        });
    }
    Ok(())
}

fn validate_allocation(config: &dyn ConfigPort) -> Result<(), WalkforwardError> {
    let value = config
        .get_string("backtest", "allocation")
        .unwrap_or_else(|| "single".to_string());
    match value.trim() {
        "single" | "even-split" => Ok(()),
        other => Err(WalkforwardError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "allocation".to_string(),
            reason: format!("unknown allocation '{}', expected single or even-split", other),
        }),
    }
}

fn validate_windows(config: &dyn ConfigPort) -> Result<(), WalkforwardError> {
    for key in [
        "optimization_window_days",
        "test_window_days",
        "step_days",
    ] {
        let value = config.get_int("walkforward", key, 1);
        if value < 1 {
            return Err(WalkforwardError::ConfigInvalid {
                section: "walkforward".to_string(),
                key: key.to_string(),
                reason: format!("{} must be at least 1", key),
            });
        }
    }
    Ok(())
}

fn validate_strategy_section(config: &dyn ConfigPort) -> Result<(), WalkforwardError> {
    let kind = config
        .get_string("strategy", "kind")
        .unwrap_or_else(|| "ma-cross".to_string());
    match kind.trim() {
        "ma-cross" => {
            validate_usize_list(config, "short_periods")?;
            validate_usize_list(config, "long_periods")?;
            Ok(())
        }
        "rsi" => {
            validate_usize_list(config, "rsi_periods")?;
            validate_f64_list(config, "oversold_levels")?;
            validate_f64_list(config, "overbought_levels")?;
            Ok(())
        }
        other => Err(WalkforwardError::ConfigInvalid {
            section: "strategy".to_string(),
            key: "kind".to_string(),
            reason: format!("unknown strategy '{}', expected ma-cross or rsi", other),
        }),
    }
}

fn validate_usize_list(config: &dyn ConfigPort, key: &str) -> Result<(), WalkforwardError> {
    if let Some(value) = config.get_string("strategy", key) {
        parse_usize_list(&value).map_err(|reason| WalkforwardError::ConfigInvalid {
            section: "strategy".to_string(),
            key: key.to_string(),
            reason,
        })?;
    }
    Ok(())
}

fn validate_f64_list(config: &dyn ConfigPort, key: &str) -> Result<(), WalkforwardError> {
    if let Some(value) = config.get_string("strategy", key) {
        parse_f64_list(&value).map_err(|reason| WalkforwardError::ConfigInvalid {
            section: "strategy".to_string(),
            key: key.to_string(),
            reason,
        })?;
    }
    Ok(())
}

/// Parses a comma-separated list of positive integers.
pub fn parse_usize_list(value: &str) -> Result<Vec<usize>, String> {
    let mut out = Vec::new();
    for item in value.split(',') {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }
        let parsed: usize = item
            .parse()
            .map_err(|_| format!("'{}' is not a positive integer", item))?;
        if parsed == 0 {
            return Err("list entries must be at least 1".to_string());
        }
        out.push(parsed);
    }
    if out.is_empty() {
        return Err("list must contain at least one value".to_string());
    }
    Ok(out)
}

/// Parses a comma-separated list of numbers.
pub fn parse_f64_list(value: &str) -> Result<Vec<f64>, String> {
    let mut out = Vec::new();
    for item in value.split(',') {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }
        let parsed: f64 = item
            .parse()
            .map_err(|_| format!("'{}' is not a number", item))?;
        out.push(parsed);
    }
    if out.is_empty() {
        return Err("list must contain at least one value".to_string());
    }
    Ok(out)
}
