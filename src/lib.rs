//! Gradient boosting training core.
//!
//! A data-parallel, column-oriented implementation of gradient-boosted
//! decision trees: a chunked frame over huge paged arrays, a two-pass
//! histogram-based split finder dispatched across Rayon, and a boosting
//! driver that fits successive trees to the loss gradient of a configurable
//! [`gbm::distribution::Distribution`].

pub mod collections;
pub mod concurrency;
pub mod config;
pub mod errors;
pub mod gbm;
pub mod ml;
pub mod termination;
