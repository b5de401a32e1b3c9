//! Domain error types.

/// Fatal errors for etfprofit. Row-level problems are logged, never returned.
#[derive(Debug, thiserror::Error)]
pub enum EtfProfitError {
    #[error("cannot read trade log {file}: {reason}")]
    TradeLogRead { file: String, reason: String },

    #[error("malformed trade log {file}: {reason}")]
    TradeLogFormat { file: String, reason: String },

    #[error("trade log {file} is missing required columns: {}", missing.join(", "))]
    MissingColumns { file: String, missing: Vec<String> },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("state snapshot parse error in {file}: {reason}")]
    SnapshotParse { file: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&EtfProfitError> for std::process::ExitCode {
    fn from(err: &EtfProfitError) -> Self {
        std::process::ExitCode::from(err.exit_status())
    }
}

impl EtfProfitError {
    /// Numeric process exit status for this error.
    pub fn exit_status(&self) -> u8 {
        match self {
            EtfProfitError::TradeLogRead { .. } | EtfProfitError::Io(_) => 1,
            EtfProfitError::TradeLogFormat { .. } | EtfProfitError::MissingColumns { .. } => 2,
            EtfProfitError::ConfigParse { .. }
            | EtfProfitError::ConfigInvalid { .. }
            | EtfProfitError::SnapshotParse { .. } => 3,
        }
    }
}
