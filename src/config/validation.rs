//! Shared validation helpers for config builders.

use thiserror::Error;

/// Errors raised while validating a config before it is built.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{name} is required")]
    RequiredParameter { name: &'static str },

    #[error("{name} must be positive, got {value}")]
    MustBePositive { name: &'static str, value: f64 },

    #[error("{name} must be in [{min}, {max}], got {value}")]
    OutOfRange {
        name: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },

    #[error("invalid value for {parameter}: {reason}")]
    InvalidParameter {
        parameter: &'static str,
        reason: String,
    },
}

/// Small collection of associated functions used by config builders to
/// validate fields before construction.
pub struct ConfigValidation;

impl ConfigValidation {
    pub fn validate_positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
        if value > 0.0 {
            Ok(())
        } else {
            Err(ConfigError::MustBePositive { name, value })
        }
    }

    pub fn validate_range(
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    ) -> Result<(), ConfigError> {
        if value >= min && value <= max {
            Ok(())
        } else {
            Err(ConfigError::OutOfRange {
                name,
                min,
                max,
                value,
            })
        }
    }

    pub fn validate_non_empty<T>(name: &'static str, slice: &[T]) -> Result<(), ConfigError> {
        if slice.is_empty() {
            Err(ConfigError::InvalidParameter {
                parameter: name,
                reason: "must not be empty".to_string(),
            })
        } else {
            Ok(())
        }
    }
}
