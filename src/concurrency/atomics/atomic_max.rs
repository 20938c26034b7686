use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic f64 running maximum, updated via a compare-and-swap loop.
///
/// Used by the histogram builder to track the best split gain found so far
/// across worker threads without a lock.
///
/// # Examples
///
/// ```
/// use boosted_frame::concurrency::atomics::AtomicMax;
/// use std::sync::atomic::Ordering;
///
/// let best = AtomicMax::new(f64::NEG_INFINITY);
/// best.update(1.5, Ordering::SeqCst);
/// best.update(0.5, Ordering::SeqCst);
/// assert_eq!(best.load(Ordering::SeqCst), 1.5);
/// ```
#[derive(Debug)]
pub struct AtomicMax {
    bits: AtomicU64,
}

impl AtomicMax {
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

    /// Updates the stored value to `value` if it is greater than the current
    /// value. Returns the maximum after the update.
    pub fn update(&self, value: f64, ordering: Ordering) -> f64 {
        let mut current_bits = self.bits.load(ordering);
        loop {
            let current = f64::from_bits(current_bits);
            if value <= current {
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
    fn update_keeps_the_larger_value() {
        let max = AtomicMax::new(0.0);
        assert_eq!(max.update(5.0, Ordering::SeqCst), 5.0);
        assert_eq!(max.update(2.0, Ordering::SeqCst), 5.0);
        assert_eq!(max.load(Ordering::SeqCst), 5.0);
    }

    #[test]
    fn new_sets_initial_value() {
        let max = AtomicMax::new(-1.0);
        assert_eq!(max.load(Ordering::SeqCst), -1.0);
    }
}
