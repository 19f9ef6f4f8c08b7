//! Block header - the fixed metadata slot in front of every user pointer.
//!
//! Every block handed out by the facade is laid out as
//! `[Header (16 bytes)][payload ...]` and the user sees a pointer to the
//! payload. This module is the only place that steps from a user pointer
//! back to its header.

use std::mem::size_of;
use std::ptr::NonNull;

use crate::api::block::Block;
use crate::api::kind::AllocatorKind;
use crate::diagnostics::{fatal, KA101, KA103};
use crate::util::layout::{align_up, is_aligned, ALIGNMENT};

/// Metadata stamped at the start of every block.
///
/// `size` and `kind` are owned by the facade. `committed` and `offset`
/// are private to the pool strategy and record the exact free-list range
/// backing the block; other strategies leave them at `-1`. `size` never
/// falls short of `committed`.
#[repr(C, align(16))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Header {
    /// Total block size including this header; a positive multiple of 16.
    pub size: i32,
    /// `AllocatorKind` discriminant.
    pub kind: u8,
    _reserved: [u8; 3],
    /// Bytes committed from the owning region (pool only).
    pub committed: i32,
    /// Byte offset of the block within the owning region (pool only).
    pub offset: i32,
}

/// Size of the header, also the smallest padding added to any request.
pub(crate) const HEADER_SIZE: usize = size_of::<Header>();

const _: () = assert!(HEADER_SIZE == ALIGNMENT);

impl Header {
    /// A header for a block of `size` bytes owned by `kind`.
    pub const fn new(size: i32, kind: AllocatorKind) -> Self {
        Self {
            size,
            kind: kind as u8,
            _reserved: [0; 3],
            committed: -1,
            offset: -1,
        }
    }

    /// Payload bytes available after the header.
    #[inline]
    pub fn usable(&self) -> i32 {
        self.size - HEADER_SIZE as i32
    }

    /// Validate the header and decode its kind.
    ///
    /// A zero, negative or misaligned size, or an unknown kind tag, means the
    /// pointer was not produced by this facade or the block was already
    /// released. Both are fatal.
    pub fn checked_kind(&self) -> AllocatorKind {
        if self.size <= HEADER_SIZE as i32 || self.size as usize % ALIGNMENT != 0 {
            fatal(&KA101, &format!("header size {} is not a valid block size", self.size));
        }
        match AllocatorKind::from_tag(self.kind) {
            Some(kind) => kind,
            None => fatal(&KA101, &format!("header kind tag {} is out of range", self.kind)),
        }
    }
}

/// Pad a request: add the header and round up to the block alignment.
///
/// `bytes` must be positive. Returns `None` when the padded size no longer
/// fits an `i32`, which callers treat as exhaustion.
pub(crate) fn pad_request(bytes: i32) -> Option<i32> {
    debug_assert!(bytes > 0);
    let padded = align_up(bytes as usize + HEADER_SIZE, ALIGNMENT);
    i32::try_from(padded).ok()
}

/// Header pointer for the block starting at `block`.
#[inline]
pub(crate) fn at(block: NonNull<u8>) -> NonNull<Header> {
    block.cast()
}

/// User pointer for the block whose header lives at `header`.
#[inline]
pub(crate) fn user_ptr(header: NonNull<Header>) -> NonNull<u8> {
    // SAFETY: every header is followed by at least one payload byte inside
    // the same allocation, so one-past-the-header stays in bounds.
    unsafe { NonNull::new_unchecked(header.as_ptr().add(1).cast::<u8>()) }
}

/// Recover the header pointer in front of a user block.
///
/// Panics if the block is not on the block alignment.
#[inline]
pub(crate) fn of(block: Block) -> NonNull<Header> {
    let addr = block.addr();
    if !is_aligned(addr) {
        fatal(&KA103, &format!("pointer {:#x} is not {}-byte aligned", addr, ALIGNMENT));
    }
    // SAFETY: `Block` values are only produced by the facade (or by the
    // caller through `Block::from_raw`, whose contract requires the same),
    // so `HEADER_SIZE` bytes before the payload belong to the same block.
    unsafe { NonNull::new_unchecked(block.as_ptr().sub(HEADER_SIZE).cast::<Header>()) }
}

/// Read the header in front of a user block.
#[inline]
pub(crate) fn read(block: Block) -> Header {
    // SAFETY: see `of`; the header was written when the block was produced.
    unsafe { of(block).as_ptr().read() }
}

/// Overwrite `size` and `kind`, leaving the strategy-private fields intact.
///
/// A block whose strategy committed more than `size` owns the whole
/// committed range, so the stamped size is the larger of the two. Returns
/// the stamped size.
///
/// # Safety
///
/// `header` must point at a live block header.
#[inline]
pub(crate) unsafe fn stamp(header: NonNull<Header>, size: i32, kind: AllocatorKind) -> i32 {
    let h = header.as_ptr();
    let size = size.max((*h).committed);
    (*h).size = size;
    (*h).kind = kind as u8;
    size
}
