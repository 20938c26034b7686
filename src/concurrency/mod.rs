//! Concurrency primitives shared by the boosting engine.
//!
//! [`Concurrency`] sizes the parallel generator `HugeLongArray::with_generator`
//! fills pages with; [`atomics`] gives lock-free accumulation for the
//! shared-histogram concurrency mode in `gbm::histogram_builder`. The boosting
//! engine's own fan-out (row routing, histogram aggregation, split search,
//! leaf fit, ensemble update) goes straight through `rayon`'s own
//! `into_par_iter`/`par_chunks`/`join` rather than a bespoke dispatcher.

pub mod atomics;
pub mod concurrency_level;

pub use atomics::{AtomicDouble, AtomicMax, AtomicMin};
pub use concurrency_level::Concurrency;
