//! Allocation observers.
//!
//! The facade reports every alloc, realloc and free of a tracked kind to an
//! [`AllocObserver`]. [`NoopObserver`] compiles to nothing; [`LeakTracker`]
//! keeps a ledger of live blocks and turns it into a [`LeakReport`] at
//! shutdown.

mod leak;
mod report;

pub use leak::{LeakEntry, LeakTracker};
pub use report::LeakReport;

use crate::api::kind::AllocatorKind;

/// Receives allocation events from the facade.
///
/// Called from every thread that allocates, so implementations synchronise
/// internally. Addresses are user-pointer addresses.
pub trait AllocObserver: Send + Sync {
    /// A block of `size` bytes (header included) was handed out.
    fn on_alloc(&self, address: usize, size: usize, kind: AllocatorKind);

    /// A block was resized; `old` is gone and `new` holds `size` bytes.
    fn on_realloc(&self, old: usize, new: usize, size: usize, kind: AllocatorKind);

    /// A block was released.
    fn on_free(&self, address: usize);

    /// Every block of `kind` was dropped by a per-tick clear.
    fn on_clear(&self, _kind: AllocatorKind) {}

    /// Take everything still live. Called once per shutdown.
    fn drain(&self) -> LeakReport {
        LeakReport::default()
    }
}

/// Observer that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl AllocObserver for NoopObserver {
    #[inline(always)]
    fn on_alloc(&self, _address: usize, _size: usize, _kind: AllocatorKind) {}

    #[inline(always)]
    fn on_realloc(&self, _old: usize, _new: usize, _size: usize, _kind: AllocatorKind) {}

    #[inline(always)]
    fn on_free(&self, _address: usize) {}
}

impl<O: AllocObserver + ?Sized> AllocObserver for std::sync::Arc<O> {
    fn on_alloc(&self, address: usize, size: usize, kind: AllocatorKind) {
        (**self).on_alloc(address, size, kind)
    }

    fn on_realloc(&self, old: usize, new: usize, size: usize, kind: AllocatorKind) {
        (**self).on_realloc(old, new, size, kind)
    }

    fn on_free(&self, address: usize) {
        (**self).on_free(address)
    }

    fn on_clear(&self, kind: AllocatorKind) {
        (**self).on_clear(kind)
    }

    fn drain(&self) -> LeakReport {
        (**self).drain()
    }
}
