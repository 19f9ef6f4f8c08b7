//! Allocation statistics.

use crate::api::kind::AllocatorKind;
use crate::sync::atomics::{AtomicCounter, AtomicGauge};

/// Statistics for one allocator kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KindStats {
    /// Block bytes (headers included) currently live.
    pub live_bytes: usize,

    /// High-water mark of `live_bytes`.
    pub peak_bytes: usize,

    /// Successful allocations, including reallocations.
    pub alloc_count: u64,

    /// Frees, including blocks released by a failed realloc.
    pub free_count: u64,

    /// Requests that found the region exhausted.
    pub failed_count: u64,

    /// Bytes still available in the region (`None` for system-backed kinds).
    pub available: Option<usize>,
}

impl KindStats {
    /// Blocks allocated but not yet freed.
    pub fn active_allocations(&self) -> u64 {
        self.alloc_count.saturating_sub(self.free_count)
    }
}

/// Aggregated allocation statistics, one entry per kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllocStats {
    /// Per-kind statistics in registry order.
    pub kinds: [KindStats; AllocatorKind::COUNT],
}

impl AllocStats {
    /// Statistics for `kind`.
    pub fn kind(&self, kind: AllocatorKind) -> &KindStats {
        &self.kinds[kind.index()]
    }

    /// Live bytes across all kinds.
    pub fn total_live_bytes(&self) -> usize {
        self.kinds.iter().map(|k| k.live_bytes).sum()
    }

    /// Failed requests across all kinds.
    pub fn total_failures(&self) -> u64 {
        self.kinds.iter().map(|k| k.failed_count).sum()
    }
}

impl std::fmt::Display for AllocStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Allocation Statistics:")?;
        for kind in AllocatorKind::ALL {
            let s = self.kind(kind);
            write!(
                f,
                "  {:<10} live {:>10} B  peak {:>10} B  allocs {:>8}  frees {:>8}  failed {:>4}",
                kind.name(),
                s.live_bytes,
                s.peak_bytes,
                s.alloc_count,
                s.free_count,
                s.failed_count
            )?;
            match s.available {
                Some(bytes) => writeln!(f, "  free {} B", bytes)?,
                None => writeln!(f)?,
            }
        }
        Ok(())
    }
}

/// Live counters behind [`KindStats`].
#[derive(Default)]
pub(crate) struct KindCounters {
    live: AtomicGauge,
    allocs: AtomicCounter,
    frees: AtomicCounter,
    failures: AtomicCounter,
}

impl KindCounters {
    pub fn record_alloc(&self, size: usize) {
        self.allocs.increment();
        self.live.add(size);
    }

    pub fn record_free(&self, size: usize) {
        self.frees.increment();
        self.live.sub(size);
    }

    pub fn record_realloc(&self, old: usize, new: usize) {
        self.allocs.increment();
        self.frees.increment();
        self.live.sub(old);
        self.live.add(new);
    }

    pub fn record_failure(&self) {
        self.failures.increment();
    }

    /// Every live block of the kind was dropped at once.
    pub fn record_clear(&self) {
        self.live.clear();
    }

    pub fn snapshot(&self, available: Option<usize>) -> KindStats {
        KindStats {
            live_bytes: self.live.get(),
            peak_bytes: self.live.peak(),
            alloc_count: self.allocs.get(),
            free_count: self.frees.get(),
            failed_count: self.failures.get(),
            available,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_snapshot() {
        let counters = KindCounters::default();
        counters.record_alloc(64);
        counters.record_realloc(64, 128);
        counters.record_failure();

        let s = counters.snapshot(Some(1024));
        assert_eq!(s.live_bytes, 128);
        assert_eq!(s.peak_bytes, 128);
        assert_eq!(s.alloc_count, 2);
        assert_eq!(s.free_count, 1);
        assert_eq!(s.active_allocations(), 1);
        assert_eq!(s.failed_count, 1);
    }

    #[test]
    fn test_display_lists_kinds() {
        let text = AllocStats::default().to_string();
        assert!(text.contains("scratch"));
        assert!(text.contains("pool"));
    }
}
