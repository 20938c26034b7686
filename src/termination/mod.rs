//! Cooperative cancellation for long-running training jobs.
//!
//! [`TerminationFlag`] is threaded through the boosting driver and the
//! parallel histogram builder; workers check [`TerminationFlag::running`]
//! between row-chunks rather than being interrupted, so a cancellation
//! takes effect within one batch rather than instantly.

pub mod terminated_exception;
pub mod termination_flag;
pub mod termination_monitor;

pub use terminated_exception::TerminatedException;
pub use termination_flag::TerminationFlag;
pub use termination_monitor::{EmptyTerminationMonitor, TerminationMonitor};
