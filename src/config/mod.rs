//! Configuration traits and validation shared across the crate.
//!
//! Concrete algorithm configs (e.g. [`crate::gbm::GbmConfig`]) implement the
//! traits defined here and validate themselves through [`validation::ConfigValidation`].

pub mod base_types;
pub mod validation;

pub use base_types::*;
pub use validation::*;
