//! Pooled heap - a locked free-list over one large region.
//!
//! Every public operation holds the same mutex for its whole duration:
//! free-list scan, split or coalesce, header stamp and payload copy. Pool
//! traffic is serialised in exchange for a trivially correct design; hot
//! small allocations belong on the scratch or stack kinds.

use std::ptr::NonNull;

use super::free_list::{FreeList, FreeRange};
use super::{move_payload, StrategyOptions, SubAllocator, FREED_PATTERN};
use crate::api::kind::AllocatorKind;
use crate::core::header::{self, Header, HEADER_SIZE};
use crate::core::region::Region;
use crate::diagnostics::{fatal, KA101, KA106};
use crate::sync::mutex::Mutex;

/// Region state guarded by the pool lock.
struct PoolState {
    base: Option<NonNull<u8>>,
    free: FreeList,
    poison: bool,
}

// SAFETY: `base` is only dereferenced while the pool lock is held.
unsafe impl Send for PoolState {}

/// Thread-safe free-list heap.
///
/// Blocks record the exact range they were carved from in the header's
/// `committed` and `offset` fields. Those, not the facade's `size`, drive
/// free and realloc: a range whose leftover was too small to split is
/// committed whole and must be returned whole.
pub struct Pool {
    kind: AllocatorKind,
    state: Mutex<PoolState>,
}

impl Pool {
    /// Create a detached pool for `kind`.
    pub fn new(kind: AllocatorKind) -> Self {
        Self {
            kind,
            state: Mutex::new(PoolState {
                base: None,
                free: FreeList::new(0),
                poison: false,
            }),
        }
    }

    /// Snapshot of the free ranges.
    pub fn free_ranges(&self) -> Vec<FreeRange> {
        self.state.lock().free.ranges()
    }

    /// Total free bytes.
    pub fn free_bytes(&self) -> usize {
        self.state.lock().free.free_bytes()
    }
}

impl PoolState {
    fn carve(&mut self, size: i32) -> Option<(NonNull<Header>, FreeRange)> {
        let base = self.base?;
        let range = self.free.alloc(size)?;

        // SAFETY: the free-list only hands out ranges inside the region.
        let hdr = header::at(unsafe { NonNull::new_unchecked(base.as_ptr().add(range.offset as usize)) });
        Some((hdr, range))
    }

    /// Read back the range a block was carved from, validating it against
    /// the block's address.
    unsafe fn committed_range(&self, hdr: NonNull<Header>) -> FreeRange {
        let h = &*hdr.as_ptr();
        let Some(base) = self.base else {
            fatal(&KA106, "pool is not attached to a region");
        };

        if h.offset < 0 || h.committed < h.size {
            fatal(
                &KA101,
                &format!(
                    "pool header has offset {} and committed {} for size {}",
                    h.offset, h.committed, h.size
                ),
            );
        }
        if base.as_ptr().add(h.offset as usize) != hdr.as_ptr().cast::<u8>() {
            fatal(
                &KA106,
                &format!("block {:#x} does not sit at its recorded offset {}", hdr.as_ptr() as usize, h.offset),
            );
        }
        FreeRange::new(h.offset, h.committed)
    }
}

/// The block takes the whole committed range, unsplit tail included.
fn write_header(hdr: NonNull<Header>, kind: AllocatorKind, range: FreeRange) {
    let mut h = Header::new(range.size, kind);
    h.committed = range.size;
    h.offset = range.offset;
    // SAFETY: every range holds more than HEADER_SIZE bytes.
    unsafe { hdr.as_ptr().write(h) };
}

impl SubAllocator for Pool {
    fn init(&mut self, region: Option<&Region>, options: StrategyOptions) {
        let state = self.state.get_mut();
        state.base = region.map(Region::base);
        state.free = FreeList::new(region.map_or(0, |r| r.capacity() as i32));
        state.poison = options.poison;
    }

    fn alloc(&self, size: i32) -> Option<NonNull<Header>> {
        let mut state = self.state.lock();
        let (hdr, range) = state.carve(size)?;
        write_header(hdr, self.kind, range);
        Some(hdr)
    }

    unsafe fn realloc(&self, old: NonNull<Header>, size: i32) -> Option<NonNull<Header>> {
        let mut state = self.state.lock();
        let old_range = state.committed_range(old);
        let old_usable = (*old.as_ptr()).usable() as usize;

        // No reservation beyond committed ranges exists, so resizing is a
        // free followed by a fresh first-fit search. The freed range
        // coalesces first, which lets a block grow into a free neighbour
        // without moving.
        state.free.free(old_range);

        let Some((new, new_range)) = state.carve(size) else {
            (*old.as_ptr()).size = 0;
            return None;
        };

        // Copy before stamping: the new header may land inside the old payload.
        move_payload(old, old_usable, new, new_range.size as usize - HEADER_SIZE);
        write_header(new, self.kind, new_range);
        Some(new)
    }

    unsafe fn free(&self, hdr: NonNull<Header>) {
        let mut state = self.state.lock();
        let range = state.committed_range(hdr);

        if state.poison {
            std::ptr::write_bytes(hdr.as_ptr().cast::<u8>(), FREED_PATTERN, range.size as usize);
        }
        // A zero size makes a second free of the same block fail header validation.
        (*hdr.as_ptr()).size = 0;

        state.free.free(range);
    }

    fn clear(&self) {
        self.state.lock().free.reset();
    }

    fn shutdown(&mut self) {
        let state = self.state.get_mut();
        state.base = None;
        state.free = FreeList::new(0);
    }
}
