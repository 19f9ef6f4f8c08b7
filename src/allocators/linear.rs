//! Linear region - bump allocator for tick-temporary allocations.
//!
//! This is the hot path for scratch data.
//! No free-list, no reuse - just cursor bumping until `clear`.

use std::ptr::NonNull;

use super::{move_payload, StrategyOptions, SubAllocator, FREED_PATTERN};
use crate::api::kind::AllocatorKind;
use crate::core::header::{self, Header, HEADER_SIZE};
use crate::core::region::Region;
use crate::diagnostics::{fatal, KA106};
use crate::sync::mutex::Mutex;

/// Cursor state over one region, shared by the linear and stack strategies.
pub(crate) struct Bump {
    /// Base pointer of the attached region
    base: Option<NonNull<u8>>,

    /// Current allocation head (offset from base)
    head: usize,

    /// Total capacity in bytes
    capacity: usize,

    /// Fill reclaimed bytes on reset
    poison: bool,
}

// SAFETY: `base` is only dereferenced while the owning strategy's lock is held.
unsafe impl Send for Bump {}

impl Bump {
    pub const fn detached() -> Self {
        Self {
            base: None,
            head: 0,
            capacity: 0,
            poison: false,
        }
    }

    /// Attach to `region`. Without one (zero capacity) every push fails.
    pub fn attach(&mut self, region: Option<&Region>, options: StrategyOptions) {
        *self = Self::detached();
        if let Some(region) = region {
            self.base = Some(region.base());
            self.capacity = region.capacity();
        }
        self.poison = options.poison;
    }

    pub fn detach(&mut self) {
        *self = Self::detached();
    }

    /// Push a block of `size` bytes and stamp its header.
    pub fn push(&mut self, size: i32, kind: AllocatorKind) -> Option<NonNull<Header>> {
        let base = self.base?;
        let size = size as usize;
        if size > self.capacity - self.head {
            return None;
        }

        // SAFETY: head + size <= capacity, so the block lies in the region.
        let hdr = header::at(unsafe { NonNull::new_unchecked(base.as_ptr().add(self.head)) });
        self.head += size;

        // SAFETY: the block starts with HEADER_SIZE writable bytes.
        unsafe { hdr.as_ptr().write(Header::new(size as i32, kind)) };
        Some(hdr)
    }

    /// Offset of `hdr` from the region base, checked against the region.
    pub fn offset_of(&self, hdr: NonNull<Header>) -> usize {
        let addr = hdr.as_ptr() as usize;
        match self.base {
            Some(base) if addr >= base.as_ptr() as usize && addr < base.as_ptr() as usize + self.capacity => {
                addr - base.as_ptr() as usize
            }
            _ => fatal(&KA106, &format!("block {:#x} is not in this region", addr)),
        }
    }

    /// Whether `hdr` is the most recent block still on the cursor.
    ///
    /// # Safety
    ///
    /// `hdr` must point at a header inside the region.
    pub unsafe fn is_top(&self, hdr: NonNull<Header>) -> bool {
        self.offset_of(hdr) + (*hdr.as_ptr()).size as usize == self.head
    }

    /// Resize the top block in place and record its new size. Returns
    /// `false` if it does not fit.
    ///
    /// # Safety
    ///
    /// `hdr` must be the top block.
    pub unsafe fn resize_top(&mut self, hdr: NonNull<Header>, size: i32) -> bool {
        let offset = self.offset_of(hdr);
        if size as usize > self.capacity - offset {
            return false;
        }
        self.head = offset + size as usize;
        (*hdr.as_ptr()).size = size;
        true
    }

    /// Pop the top block.
    ///
    /// # Safety
    ///
    /// `hdr` must be the top block.
    pub unsafe fn pop(&mut self, hdr: NonNull<Header>) {
        let offset = self.offset_of(hdr);
        if self.poison {
            std::ptr::write_bytes(hdr.as_ptr().cast::<u8>(), FREED_PATTERN, self.head - offset);
        }
        self.head = offset;
    }

    /// Move the block behind `hdr` to a fresh block on top.
    ///
    /// # Safety
    ///
    /// `hdr` must be a live block inside the region.
    pub unsafe fn relocate(&mut self, hdr: NonNull<Header>, size: i32, kind: AllocatorKind) -> Option<NonNull<Header>> {
        let old_usable = (*hdr.as_ptr()).usable() as usize;
        let new = self.push(size, kind)?;
        move_payload(hdr, old_usable, new, size as usize - HEADER_SIZE);
        Some(new)
    }

    /// Reset the cursor, invalidating every block.
    pub fn reset(&mut self) {
        if self.poison {
            if let Some(base) = self.base {
                // SAFETY: [base, base + head) is inside the region.
                unsafe { std::ptr::write_bytes(base.as_ptr(), FREED_PATTERN, self.head) };
            }
        }
        self.head = 0;
    }

    /// Bytes handed out since the last reset.
    pub fn head(&self) -> usize {
        self.head
    }

    /// Bytes left.
    pub fn remaining(&self) -> usize {
        self.capacity - self.head
    }
}

/// A bump allocator whose blocks are only reclaimed by `clear`.
///
/// Not meant for concurrent use within a tick; the lock only keeps misuse
/// from racing on the cursor.
pub struct Linear {
    kind: AllocatorKind,
    bump: Mutex<Bump>,
}

impl Linear {
    /// Create a detached linear strategy for `kind`.
    pub fn new(kind: AllocatorKind) -> Self {
        Self {
            kind,
            bump: Mutex::new(Bump::detached()),
        }
    }

    /// Bytes left until the next `clear`.
    pub fn remaining(&self) -> usize {
        self.bump.lock().remaining()
    }

    /// Current cursor position.
    #[cfg(test)]
    pub fn head(&self) -> usize {
        self.bump.lock().head()
    }
}

impl SubAllocator for Linear {
    fn init(&mut self, region: Option<&Region>, options: StrategyOptions) {
        self.bump.lock().attach(region, options);
    }

    fn alloc(&self, size: i32) -> Option<NonNull<Header>> {
        self.bump.lock().push(size, self.kind)
    }

    unsafe fn realloc(&self, hdr: NonNull<Header>, size: i32) -> Option<NonNull<Header>> {
        let mut bump = self.bump.lock();
        if bump.is_top(hdr) && bump.resize_top(hdr, size) {
            return Some(hdr);
        }
        bump.relocate(hdr, size, self.kind)
    }

    unsafe fn free(&self, hdr: NonNull<Header>) {
        // Nothing is reclaimed individually; only validate ownership.
        let _ = self.bump.lock().offset_of(hdr);
    }

    fn clear(&self) {
        self.bump.lock().reset();
    }

    fn shutdown(&mut self) {
        self.bump.lock().detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear(capacity: usize) -> (Linear, Region) {
        let region = Region::new(capacity);
        let mut linear = Linear::new(AllocatorKind::Scratch);
        linear.init(Some(&region), StrategyOptions::default());
        (linear, region)
    }

    #[test]
    fn test_basic_allocation() {
        let (linear, _region) = linear(1024);

        let a = linear.alloc(32).unwrap();
        let b = linear.alloc(64).unwrap();

        assert_eq!(b.as_ptr() as usize - a.as_ptr() as usize, 32);
        assert_eq!(linear.head(), 96);
    }

    #[test]
    fn test_free_is_noop_and_clear_resets() {
        let (linear, _region) = linear(1024);

        let a = linear.alloc(32).unwrap();
        unsafe { linear.free(a) };
        assert_eq!(linear.head(), 32);

        linear.clear();
        linear.clear();
        assert_eq!(linear.head(), 0);
        assert_eq!(linear.remaining(), 1024);

        let b = linear.alloc(32).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_exhaustion() {
        let (linear, _region) = linear(64);

        assert!(linear.alloc(32).is_some());
        assert!(linear.alloc(32).is_some());
        assert!(linear.alloc(32).is_none());
    }

    #[test]
    fn test_realloc_top_grows_in_place() {
        let (linear, _region) = linear(1024);

        let a = linear.alloc(32).unwrap();
        let grown = unsafe { linear.realloc(a, 128) }.unwrap();
        assert_eq!(a, grown);
        assert_eq!(linear.head(), 128);
        assert_eq!(unsafe { (*grown.as_ptr()).size }, 128);
    }

    #[test]
    fn test_realloc_buried_block_moves_and_copies() {
        let (linear, _region) = linear(1024);

        let a = linear.alloc(48).unwrap();
        let _b = linear.alloc(32).unwrap();
        unsafe {
            let payload = header::user_ptr(a).as_ptr();
            for i in 0..32 {
                payload.add(i).write(i as u8);
            }

            let moved = linear.realloc(a, 96).unwrap();
            assert_ne!(moved, a);
            let copied = header::user_ptr(moved).as_ptr();
            for i in 0..32 {
                assert_eq!(*copied.add(i), i as u8);
            }
        }
        assert_eq!(linear.head(), 48 + 32 + 96);
    }
}
