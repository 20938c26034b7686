// Atomic aggregators for lock-free parallel operations.
//
// Lock-free atomic types for concurrent aggregation, used by the shared
// histogram mode (atomic bin accumulation) and split search (best-gain
// tracking across worker threads). All types use Compare-And-Swap (CAS)
// loops to ensure thread-safety without locks.

mod atomic_double;
mod atomic_max;
mod atomic_min;

pub use atomic_double::AtomicDouble;
pub use atomic_max::AtomicMax;
pub use atomic_min::AtomicMin;
