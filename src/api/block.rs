//! Opaque handle to a facade allocation.

use std::ptr::NonNull;

/// A live allocation produced by [`Allocators`](crate::Allocators).
///
/// A `Block` wraps the 16-byte aligned user pointer. It is `Copy` like a
/// raw pointer and carries no lifetime: validity ends when the block is
/// freed, reallocated, or (for per-frame kinds) at the next `update()`.
/// Size and kind are recovered by the facade, never by the caller.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Block {
    ptr: NonNull<u8>,
}

impl Block {
    #[inline]
    pub(crate) fn new(ptr: NonNull<u8>) -> Self {
        Self { ptr }
    }

    /// Rebuild a block from a pointer previously obtained via [`Block::as_ptr`].
    ///
    /// # Safety
    ///
    /// `ptr` must be the user pointer of a block that this facade produced
    /// and that has not been freed.
    pub unsafe fn from_raw(ptr: *mut u8) -> Option<Self> {
        NonNull::new(ptr).map(Self::new)
    }

    /// The user pointer.
    #[inline]
    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    /// The user pointer as `NonNull`.
    #[inline]
    pub fn as_non_null(&self) -> NonNull<u8> {
        self.ptr
    }

    /// The user pointer as an integer address.
    #[inline]
    pub fn addr(&self) -> usize {
        self.ptr.as_ptr() as usize
    }

    /// View the first `len` payload bytes.
    ///
    /// # Safety
    ///
    /// The block must be live, `len` must not exceed its usable size, and
    /// no mutable view may alias the returned slice.
    pub unsafe fn as_slice<'a>(&self, len: usize) -> &'a [u8] {
        std::slice::from_raw_parts(self.ptr.as_ptr(), len)
    }

    /// Mutably view the first `len` payload bytes.
    ///
    /// # Safety
    ///
    /// The block must be live, `len` must not exceed its usable size, and
    /// the returned slice must be the only view of those bytes.
    pub unsafe fn as_mut_slice<'a>(&self, len: usize) -> &'a mut [u8] {
        std::slice::from_raw_parts_mut(self.ptr.as_ptr(), len)
    }
}

impl std::fmt::Debug for Block {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Block({:#x})", self.addr())
    }
}

// SAFETY: a block is an address; ownership of the bytes behind it follows
// the caller's own discipline, exactly as for a raw pointer from malloc.
unsafe impl Send for Block {}
unsafe impl Sync for Block {}
