//! Atomic helpers for per-kind statistics.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// A monotonically increasing event counter.
pub struct AtomicCounter(AtomicU64);

impl AtomicCounter {
    /// Create a new counter.
    pub const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    /// Increment the counter.
    #[inline]
    pub fn increment(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current value.
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

impl Default for AtomicCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// An atomic gauge for byte totals that move both ways, with a high-water mark.
pub struct AtomicGauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl AtomicGauge {
    /// Create a new gauge at zero.
    pub const fn new() -> Self {
        Self {
            current: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Add to the gauge, raising the peak if needed.
    pub fn add(&self, value: usize) {
        let now = self.current.fetch_add(value, Ordering::Relaxed) + value;
        let mut peak = self.peak.load(Ordering::Relaxed);
        while now > peak {
            match self
                .peak
                .compare_exchange_weak(peak, now, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => break,
                Err(p) => peak = p,
            }
        }
    }

    /// Subtract from the gauge, saturating at zero.
    ///
    /// Saturation matters for per-frame kinds: a free that lands after the
    /// tick reset the gauge must not wrap.
    pub fn sub(&self, value: usize) {
        let _ = self
            .current
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |c| {
                Some(c.saturating_sub(value))
            });
    }

    /// Current value.
    pub fn get(&self) -> usize {
        self.current.load(Ordering::Relaxed)
    }

    /// High-water mark.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::Relaxed)
    }

    /// Drop the current value to zero, keeping the peak.
    pub fn clear(&self) {
        self.current.store(0, Ordering::Relaxed);
    }
}

impl Default for AtomicGauge {
    fn default() -> Self {
        Self::new()
    }
}
