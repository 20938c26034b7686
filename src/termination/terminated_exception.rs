use std::fmt;

/// Panic payload used by [`super::TerminationFlag::assert_running`] and
/// [`super::TerminationFlag::terminate`] to signal cooperative cancellation.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminatedException;

impl fmt::Display for TerminatedException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "training terminated by user request")
    }
}

impl std::error::Error for TerminatedException {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_a_human_readable_message() {
        assert_eq!(
            TerminatedException.to_string(),
            "training terminated by user request"
        );
    }
}
