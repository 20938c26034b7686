//! Crate-wide error type for the training core.

use crate::config::ConfigError;
use thiserror::Error;

/// Top-level error type returned by [`crate::gbm`] operations.
///
/// Deliberately does not implement `From<ConfigError>` for every call site:
/// config errors are surfaced at config-build time, training errors at
/// fit time, and collapsing both into one blanket conversion would hide
/// which phase failed.
#[derive(Debug, Error)]
pub enum GbmError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("frame error: {0}")]
    Frame(String),

    #[error("training terminated: {0}")]
    Terminated(#[from] crate::termination::TerminatedException),

    #[error("empty training set")]
    EmptyFrame,

    #[error("column index {index} out of range (frame has {columns} columns)")]
    ColumnOutOfRange { index: usize, columns: usize },

    #[error("label column {label} not found among {available} columns")]
    UnknownLabelColumn { label: String, available: usize },
}

pub type GbmResult<T> = Result<T, GbmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_convert_via_from() {
        let config_err = ConfigError::MustBePositive {
            name: "learning_rate",
            value: -1.0,
        };
        let err: GbmError = config_err.into();
        assert!(err.to_string().contains("invalid configuration"));
    }
}
