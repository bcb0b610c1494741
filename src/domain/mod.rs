//! Core domain types and logic.

pub mod config_validation;
pub mod error;
pub mod indicator;
pub mod metrics;
pub mod ohlcv;
pub mod optimizer;
pub mod series;
pub mod signal;
pub mod simulator;
pub mod walkforward;
