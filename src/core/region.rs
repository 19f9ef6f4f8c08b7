//! Backing memory regions.

use std::alloc::{alloc, dealloc, Layout};
use std::ptr::NonNull;

use crate::diagnostics::{fatal, KA004};
use crate::util::layout::block_layout;

/// One contiguous byte range acquired from the system allocator.
///
/// The registry owns every region; strategies only borrow its base and
/// capacity for the span of one init/shutdown cycle.
pub(crate) struct Region {
    base: NonNull<u8>,
    layout: Layout,
}

impl Region {
    /// Acquire a region of `capacity` bytes at block alignment.
    ///
    /// Panics if the system allocator cannot provide the memory; regions
    /// are acquired once at startup and there is nothing to fall back to.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "[kindalloc] region capacity must be non-zero");
        let Some(layout) = block_layout(capacity) else {
            fatal(&KA004, &format!("no layout for a region of {} bytes", capacity));
        };

        // SAFETY: layout has non-zero size.
        let ptr = unsafe { alloc(layout) };

        let base = match NonNull::new(ptr) {
            Some(base) => base,
            None => std::alloc::handle_alloc_error(layout),
        };

        Self { base, layout }
    }

    /// Base pointer of the region.
    #[inline]
    pub fn base(&self) -> NonNull<u8> {
        self.base
    }

    /// Total capacity in bytes.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.layout.size()
    }
}

impl Drop for Region {
    fn drop(&mut self) {
        // SAFETY: we allocated this memory in `new()` with the same layout.
        unsafe {
            dealloc(self.base.as_ptr(), self.layout);
        }
    }
}

// SAFETY: a region is plain owned memory; synchronisation of its contents
// is the owning strategy's job.
unsafe impl Send for Region {}
unsafe impl Sync for Region {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::layout::is_aligned;

    #[test]
    fn test_region_is_aligned() {
        let region = Region::new(4096);
        assert_eq!(region.capacity(), 4096);
        assert!(is_aligned(region.base().as_ptr() as usize));
    }
}
