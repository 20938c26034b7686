use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic f64 running minimum, updated via a compare-and-swap loop.
///
/// Mirror of [`super::atomic_max::AtomicMax`].
///
/// # Examples
///
/// ```
/// use boosted_frame::concurrency::atomics::AtomicMin;
/// use std::sync::atomic::Ordering;
///
/// let best = AtomicMin::new(f64::INFINITY);
/// best.update(1.5, Ordering::SeqCst);
/// best.update(3.0, Ordering::SeqCst);
/// assert_eq!(best.load(Ordering::SeqCst), 1.5);
/// ```
#[derive(Debug)]
pub struct AtomicMin {
    bits: AtomicU64,
}

impl AtomicMin {
    pub fn new(value: f64) -> Self {
        Self {
            bits: AtomicU64::new(value.to_bits()),
        }
    }

    pub fn load(&self, ordering: Ordering) -> f64 {
        f64::from_bits(self.bits.load(ordering))
    }

    pub fn store(&self, value: f64, ordering: Ordering) {
        self.bits.store(value.to_bits(), ordering);
    }

    /// Updates the stored value to `value` if it is less than the current
    /// value. Returns the minimum after the update.
    pub fn update(&self, value: f64, ordering: Ordering) -> f64 {
        let mut current_bits = self.bits.load(ordering);
        loop {
            let current = f64::from_bits(current_bits);
            if value >= current {
                return current;
            }
            match self.bits.compare_exchange_weak(
                current_bits,
                value.to_bits(),
                ordering,
                Ordering::Relaxed,
            ) {
                Ok(_) => return value,
                Err(actual) => current_bits = actual,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_keeps_the_smaller_value() {
        let min = AtomicMin::new(10.0);
        assert_eq!(min.update(5.0, Ordering::SeqCst), 5.0);
        assert_eq!(min.update(8.0, Ordering::SeqCst), 5.0);
        assert_eq!(min.load(Ordering::SeqCst), 5.0);
    }

    #[test]
    fn new_sets_initial_value() {
        let min = AtomicMin::new(99.0);
        assert_eq!(min.load(Ordering::SeqCst), 99.0);
    }
}
