//! Domain error types.

/// Top-level error type for walkforward.
#[derive(Debug, thiserror::Error)]
pub enum WalkforwardError {
    #[error("{symbol}: missing required field '{field}'")]
    Schema { symbol: String, field: String },

    #[error("missing indicator column {indicator}; recompute indicators before generating signals")]
    MissingIndicator { indicator: String },

    #[error("insufficient data for {symbol}: {reason}")]
    InsufficientData { symbol: String, reason: String },

    #[error("no common trading dates across instruments")]
    EmptyCalendar,

    #[error("no executable simulation periods")]
    NoSimulationPeriods,

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&WalkforwardError> for std::process::ExitCode {
    fn from(err: &WalkforwardError) -> Self {
        let code: u8 = match err {
            WalkforwardError::Io(_) => 1,
            WalkforwardError::ConfigParse { .. }
            | WalkforwardError::ConfigMissing { .. }
            | WalkforwardError::ConfigInvalid { .. } => 2,
            WalkforwardError::Data { .. } | WalkforwardError::Schema { .. } => 3,
            WalkforwardError::MissingIndicator { .. } => 4,
            WalkforwardError::InsufficientData { .. }
            | WalkforwardError::EmptyCalendar
            | WalkforwardError::NoSimulationPeriods => 5,
        };
        std::process::ExitCode::from(code)
    }
}
