//! Machine learning primitives shared by the boosting engine.
//!
//! Everything specific to gradient boosting itself lives in [`crate::gbm`];
//! this module only holds the small, reusable pieces (batch dispatch,
//! weighted sampling) that several algorithms would want.

pub mod core;

pub use core::*;
