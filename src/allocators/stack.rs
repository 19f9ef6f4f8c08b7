//! Stack region - bump allocator with LIFO frees.

use std::ptr::NonNull;

use super::linear::Bump;
use super::{StrategyOptions, SubAllocator};
use crate::api::kind::AllocatorKind;
use crate::core::header::Header;
use crate::core::region::Region;
use crate::diagnostics::{fatal, KA104};
use crate::sync::mutex::Mutex;

/// A bump allocator where freeing the most recent block rewinds the cursor.
///
/// Freeing anything other than the top block is a contract violation.
/// A block that has to move on realloc leaves its old bytes behind until
/// everything above them is popped or the region is cleared.
pub struct Stack {
    kind: AllocatorKind,
    bump: Mutex<Bump>,
}

impl Stack {
    /// Create a detached stack strategy for `kind`.
    pub fn new(kind: AllocatorKind) -> Self {
        Self {
            kind,
            bump: Mutex::new(Bump::detached()),
        }
    }

    /// Bytes left on the stack.
    pub fn remaining(&self) -> usize {
        self.bump.lock().remaining()
    }

    /// Current stack depth in bytes.
    #[cfg(test)]
    pub fn depth(&self) -> usize {
        self.bump.lock().head()
    }
}

impl SubAllocator for Stack {
    fn init(&mut self, region: Option<&Region>, options: StrategyOptions) {
        self.bump.lock().attach(region, options);
    }

    fn alloc(&self, size: i32) -> Option<NonNull<Header>> {
        self.bump.lock().push(size, self.kind)
    }

    unsafe fn realloc(&self, hdr: NonNull<Header>, size: i32) -> Option<NonNull<Header>> {
        let mut bump = self.bump.lock();
        if bump.is_top(hdr) {
            // The top block has the whole remainder after it; if it cannot
            // grow in place, nothing else fits either.
            if bump.resize_top(hdr, size) {
                return Some(hdr);
            }
            bump.pop(hdr);
            return None;
        }
        // A buried block that fails to move stays where it is until clear.
        bump.relocate(hdr, size, self.kind)
    }

    unsafe fn free(&self, hdr: NonNull<Header>) {
        let mut bump = self.bump.lock();
        if !bump.is_top(hdr) {
            fatal(
                &KA104,
                &format!(
                    "block at offset {} is not the top of the stack (depth {})",
                    bump.offset_of(hdr),
                    bump.head()
                ),
            );
        }
        bump.pop(hdr);
    }

    fn clear(&self) {
        self.bump.lock().reset();
    }

    fn shutdown(&mut self) {
        self.bump.lock().detach();
    }
}
