//! Alignment and padding arithmetic.

use std::alloc::Layout;

/// Alignment of every block and every user pointer handed out.
pub const ALIGNMENT: usize = 16;

/// Round `size` up to a multiple of `align` (a power of two).
#[inline]
pub const fn align_up(size: usize, align: usize) -> usize {
    (size + align - 1) & !(align - 1)
}

/// Whether an address sits on the block alignment.
#[inline]
pub const fn is_aligned(addr: usize) -> bool {
    addr & (ALIGNMENT - 1) == 0
}

/// Layout of a raw block of `size` bytes at block alignment.
///
/// Returns `None` when the size overflows `isize` once rounded.
#[inline]
pub fn block_layout(size: usize) -> Option<Layout> {
    Layout::from_size_align(size, ALIGNMENT).ok()
}

/// Whether the half-open byte ranges `[a, a + a_len)` and `[b, b + b_len)` share a byte.
#[inline]
pub const fn overlaps(a: usize, a_len: usize, b: usize, b_len: usize) -> bool {
    a < b + b_len && b < a + a_len
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0, 16), 0);
        assert_eq!(align_up(1, 16), 16);
        assert_eq!(align_up(16, 16), 16);
        assert_eq!(align_up(17, 16), 32);
    }

    #[test]
    fn test_is_aligned() {
        assert!(is_aligned(0));
        assert!(is_aligned(48));
        assert!(!is_aligned(40));
    }

    #[test]
    fn test_overlaps() {
        assert!(overlaps(0, 32, 16, 32));
        assert!(overlaps(16, 32, 0, 32));
        assert!(!overlaps(0, 16, 16, 16));
        assert!(!overlaps(64, 16, 0, 64));
    }
}
