//! ML core primitives shared by the boosting engine.

pub mod samplers;

pub use samplers::*;
