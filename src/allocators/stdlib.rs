//! System allocator pass-through.

use std::alloc::{alloc, dealloc, realloc};
use std::ptr::NonNull;

use super::{StrategyOptions, SubAllocator, FREED_PATTERN};
use crate::api::kind::AllocatorKind;
use crate::core::header::{self, Header};
use crate::core::region::Region;
use crate::util::layout::block_layout;

/// Defers every block to the global allocator.
///
/// Owns no region and keeps no state beyond the poison flag, so it is
/// usable before `init` and after `shutdown`. The block size needed to
/// rebuild the `Layout` on free comes from the header.
pub struct Stdlib {
    kind: AllocatorKind,
    poison: bool,
}

impl Stdlib {
    /// Create a pass-through for `kind`.
    pub fn new(kind: AllocatorKind) -> Self {
        Self {
            kind,
            poison: cfg!(feature = "debug"),
        }
    }
}

impl SubAllocator for Stdlib {
    fn init(&mut self, region: Option<&Region>, options: StrategyOptions) {
        debug_assert!(region.is_none());
        self.poison = options.poison;
    }

    fn alloc(&self, size: i32) -> Option<NonNull<Header>> {
        let layout = block_layout(size as usize)?;

        // SAFETY: padded sizes are never zero.
        let ptr = NonNull::new(unsafe { alloc(layout) })?;

        let hdr = header::at(ptr);
        // SAFETY: fresh block of at least HEADER_SIZE bytes.
        unsafe { hdr.as_ptr().write(Header::new(size, self.kind)) };
        Some(hdr)
    }

    unsafe fn realloc(&self, hdr: NonNull<Header>, size: i32) -> Option<NonNull<Header>> {
        let old_size = (*hdr.as_ptr()).size as usize;
        let layout = block_layout(old_size)?;

        match NonNull::new(realloc(hdr.as_ptr().cast::<u8>(), layout, size as usize)) {
            Some(ptr) => Some(header::at(ptr)),
            None => {
                self.free(hdr);
                None
            }
        }
    }

    unsafe fn free(&self, hdr: NonNull<Header>) {
        let size = (*hdr.as_ptr()).size as usize;
        let Some(layout) = block_layout(size) else {
            return;
        };
        if self.poison {
            std::ptr::write_bytes(hdr.as_ptr().cast::<u8>(), FREED_PATTERN, size);
        }
        dealloc(hdr.as_ptr().cast::<u8>(), layout);
    }

    fn clear(&self) {}

    fn shutdown(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stdlib_alloc_realloc_free() {
        let stdlib = Stdlib::new(AllocatorKind::General);

        let hdr = stdlib.alloc(64).unwrap();
        unsafe {
            assert_eq!((*hdr.as_ptr()).size, 64);
            let payload = header::user_ptr(hdr).as_ptr();
            payload.write_bytes(0x5A, 48);

            let grown = stdlib.realloc(hdr, 256).unwrap();
            (*grown.as_ptr()).size = 256;
            assert_eq!(*header::user_ptr(grown).as_ptr().add(47), 0x5A);

            stdlib.free(grown);
        }
    }
}
