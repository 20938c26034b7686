//! Base configuration traits
//!
//! Provides the small vocabulary of marker traits that concrete configs
//! (e.g. [`crate::gbm::GbmConfig`]) implement, following the same shape as
//! the rest of the config layer.

/// Marker trait for all configuration types
pub trait Config: Send + Sync {}

/// Configuration with concurrency settings
pub trait ConcurrencyConfig: Config {
    fn concurrency(&self) -> usize;
}

/// Configuration with iteration settings
pub trait IterationsConfig: Config {
    fn max_iterations(&self) -> usize;
    fn tolerance(&self) -> Option<f64>;
}
