//! Free-list over byte ranges of a pool region.
//!
//! Ranges are kept in a `BTreeMap` keyed by offset. Allocation is
//! first-fit in ascending offset order, so the lowest fitting range always
//! wins; frees coalesce with both neighbours on insert. The policy keeps
//! fragmentation drifting towards the end of the region and makes reuse
//! deterministic.

use std::collections::BTreeMap;

use crate::core::header::HEADER_SIZE;
use crate::diagnostics::{fatal, KA101};
use crate::util::layout::ALIGNMENT;

/// Remainders smaller than this are not split off; the whole range is
/// committed instead. A block needs room for a header and one payload unit.
const MIN_SPLIT: i32 = (HEADER_SIZE + ALIGNMENT) as i32;

/// A reclaimed sub-range of a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FreeRange {
    /// Byte offset from the region base.
    pub offset: i32,
    /// Length in bytes.
    pub size: i32,
}

impl FreeRange {
    /// Create a range.
    pub const fn new(offset: i32, size: i32) -> Self {
        Self { offset, size }
    }

    /// One past the last byte.
    #[inline]
    pub const fn end(&self) -> i32 {
        self.offset + self.size
    }
}

/// The set of free ranges within one region.
#[derive(Debug)]
pub(crate) struct FreeList {
    ranges: BTreeMap<i32, i32>,
    capacity: i32,
}

impl FreeList {
    /// A free-list with the whole `capacity` available.
    pub fn new(capacity: i32) -> Self {
        let mut list = Self {
            ranges: BTreeMap::new(),
            capacity,
        };
        list.reset();
        list
    }

    /// Make the whole region one free range again.
    pub fn reset(&mut self) {
        self.ranges.clear();
        if self.capacity > 0 {
            self.ranges.insert(0, self.capacity);
        }
    }

    /// Take `size` bytes from the lowest-offset range that fits.
    ///
    /// The returned range may be larger than `size` when the leftover would
    /// be too small to ever hold a block.
    pub fn alloc(&mut self, size: i32) -> Option<FreeRange> {
        debug_assert!(size > 0);

        let (&offset, &available) = self.ranges.iter().find(|(_, &len)| len >= size)?;
        self.ranges.remove(&offset);

        let remainder = available - size;
        if remainder >= MIN_SPLIT {
            self.ranges.insert(offset + size, remainder);
            Some(FreeRange::new(offset, size))
        } else {
            Some(FreeRange::new(offset, available))
        }
    }

    /// Return a range, merging it with adjacent free ranges.
    ///
    /// Overlap with an existing free range means the bytes were already
    /// free: a double free or a forged header. That is fatal.
    pub fn free(&mut self, range: FreeRange) {
        if range.offset < 0 || range.size <= 0 || range.end() > self.capacity {
            fatal(
                &KA101,
                &format!(
                    "pool range {}..{} is outside the region (capacity {})",
                    range.offset,
                    range.end(),
                    self.capacity
                ),
            );
        }

        let mut start = range.offset;
        let mut end = range.end();

        if let Some((&prev_off, &prev_len)) = self.ranges.range(..start).next_back() {
            let prev_end = prev_off + prev_len;
            if prev_end > start {
                fatal(&KA101, &format!("pool range at {} is already free", range.offset));
            }
            if prev_end == start {
                self.ranges.remove(&prev_off);
                start = prev_off;
            }
        }

        if let Some((&next_off, &next_len)) = self.ranges.range(range.offset..).next() {
            if next_off < end {
                fatal(&KA101, &format!("pool range at {} is already free", range.offset));
            }
            if next_off == end {
                self.ranges.remove(&next_off);
                end = next_off + next_len;
            }
        }

        self.ranges.insert(start, end - start);
    }

    /// Snapshot of the free ranges in offset order.
    pub fn ranges(&self) -> Vec<FreeRange> {
        self.ranges
            .iter()
            .map(|(&offset, &size)| FreeRange::new(offset, size))
            .collect()
    }

    /// Total free bytes.
    pub fn free_bytes(&self) -> usize {
        self.ranges.values().map(|&len| len as usize).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_fit_splits_lowest_range() {
        let mut list = FreeList::new(1024);

        let a = list.alloc(64).unwrap();
        let b = list.alloc(64).unwrap();
        assert_eq!(a, FreeRange::new(0, 64));
        assert_eq!(b, FreeRange::new(64, 64));
        assert_eq!(list.ranges(), vec![FreeRange::new(128, 896)]);
    }

    #[test]
    fn test_small_remainder_is_committed() {
        let mut list = FreeList::new(96);

        let a = list.alloc(80).unwrap();
        assert_eq!(a, FreeRange::new(0, 96));
        assert!(list.ranges().is_empty());
        assert!(list.alloc(32).is_none());
    }

    #[test]
    fn test_coalesce_both_sides() {
        let mut list = FreeList::new(256);
        let a = list.alloc(64).unwrap();
        let b = list.alloc(64).unwrap();
        let c = list.alloc(64).unwrap();
        let _d = list.alloc(64).unwrap();

        list.free(a);
        list.free(c);
        assert_eq!(list.ranges().len(), 2);

        list.free(b);
        assert_eq!(list.ranges(), vec![FreeRange::new(0, 192)]);
    }

    #[test]
    fn test_reuse_prefers_lowest_offset() {
        let mut list = FreeList::new(1024);
        let a = list.alloc(128).unwrap();
        let _b = list.alloc(64).unwrap();

        list.free(a);
        let c = list.alloc(64).unwrap();
        assert_eq!(c.offset, 0);
    }

    #[test]
    fn test_reset_restores_single_range() {
        let mut list = FreeList::new(512);
        list.alloc(64).unwrap();
        list.alloc(128).unwrap();

        list.reset();
        list.reset();
        assert_eq!(list.ranges(), vec![FreeRange::new(0, 512)]);
        assert_eq!(list.free_bytes(), 512);
    }

    #[test]
    #[should_panic(expected = "already free")]
    fn test_double_free_is_fatal() {
        let mut list = FreeList::new(256);
        let a = list.alloc(64).unwrap();
        list.free(a);
        list.free(a);
    }
}
