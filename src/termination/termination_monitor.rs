/// Source of truth for whether a running computation should stop.
///
/// Implementations typically wrap an external cancellation signal (a CLI
/// Ctrl-C handler, an RPC deadline, a user-cancelled job). [`super::TerminationFlag`]
/// polls this at a throttled interval rather than on every row.
pub trait TerminationMonitor {
    fn is_terminated(&self) -> bool;
}

/// A monitor that never terminates. Used as the default when no external
/// cancellation source is wired up.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyTerminationMonitor;

impl TerminationMonitor for EmptyTerminationMonitor {
    fn is_terminated(&self) -> bool {
        false
    }
}
