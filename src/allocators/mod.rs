//! Allocation strategies.
//!
//! Each strategy serves one [`AllocatorKind`] slot of the registry and
//! implements the same capability set, [`SubAllocator`]. Dispatch goes
//! through the closed [`Backend`] enum rather than trait objects.

use std::ptr::NonNull;

use crate::api::kind::AllocatorKind;
use crate::core::header::Header;
use crate::core::region::Region;

pub(crate) mod free_list;
pub(crate) mod linear;
pub(crate) mod pool;
pub(crate) mod stack;
pub(crate) mod stdlib;

use free_list::FreeRange;
use linear::Linear;
use pool::Pool;
use stack::Stack;
use stdlib::Stdlib;

/// Byte written over reclaimed memory when poisoning is enabled.
pub const FREED_PATTERN: u8 = 0xCD;

/// Options handed to a strategy at `init`.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct StrategyOptions {
    /// Fill reclaimed bytes with [`FREED_PATTERN`].
    pub poison: bool,
}

/// The capability set every strategy provides.
///
/// Sizes are padded block sizes (header included, multiple of 16). Header
/// pointers point at the start of the block. A strategy writes a full
/// [`Header`] into every block it hands out; the facade then stamps the
/// final `size` and `kind`.
pub(crate) trait SubAllocator {
    /// Attach to `region` (absent for system-backed strategies).
    fn init(&mut self, region: Option<&Region>, options: StrategyOptions);

    /// Carve a block of `size` bytes. `None` when the region is exhausted.
    fn alloc(&self, size: i32) -> Option<NonNull<Header>>;

    /// Resize a block, possibly moving it. The payload is preserved up to the
    /// smaller of the old and new usable sizes.
    ///
    /// On `None` the old block has been released as far as this strategy can
    /// release anything: callers must not touch it again.
    ///
    /// # Safety
    ///
    /// `header` must be a live block produced by this strategy.
    unsafe fn realloc(&self, header: NonNull<Header>, size: i32) -> Option<NonNull<Header>>;

    /// Release a block.
    ///
    /// # Safety
    ///
    /// `header` must be a live block produced by this strategy.
    unsafe fn free(&self, header: NonNull<Header>);

    /// Drop every live block at once.
    fn clear(&self);

    /// Detach from the region. No block may be used afterwards.
    fn shutdown(&mut self);
}

/// Closed set of strategies the registry can hold.
pub(crate) enum Backend {
    /// System allocator pass-through.
    Stdlib(Stdlib),
    /// Bump allocator, bulk reset only.
    Linear(Linear),
    /// Bump allocator with LIFO frees.
    Stack(Stack),
    /// Locked free-list heap.
    Pool(Pool),
}

impl Backend {
    /// The strategy that serves `kind`.
    pub fn for_kind(kind: AllocatorKind) -> Self {
        match kind {
            AllocatorKind::General | AllocatorKind::Debug => Backend::Stdlib(Stdlib::new(kind)),
            AllocatorKind::Scratch => Backend::Linear(Linear::new(kind)),
            AllocatorKind::TemporaryStack => Backend::Stack(Stack::new(kind)),
            AllocatorKind::Pool => Backend::Pool(Pool::new(kind)),
        }
    }

    /// Whether this strategy needs a backing region.
    pub fn needs_region(&self) -> bool {
        !matches!(self, Backend::Stdlib(_))
    }

    /// Free ranges of a pool strategy; empty for the others.
    pub fn free_ranges(&self) -> Vec<FreeRange> {
        match self {
            Backend::Pool(pool) => pool.free_ranges(),
            _ => Vec::new(),
        }
    }

    /// Bytes currently available for new blocks, when the strategy can tell.
    pub fn available(&self) -> Option<usize> {
        match self {
            Backend::Stdlib(_) => None,
            Backend::Linear(linear) => Some(linear.remaining()),
            Backend::Stack(stack) => Some(stack.remaining()),
            Backend::Pool(pool) => Some(pool.free_bytes()),
        }
    }
}

macro_rules! dispatch {
    ($self:expr, $s:ident => $body:expr) => {
        match $self {
            Backend::Stdlib($s) => $body,
            Backend::Linear($s) => $body,
            Backend::Stack($s) => $body,
            Backend::Pool($s) => $body,
        }
    };
}

impl SubAllocator for Backend {
    fn init(&mut self, region: Option<&Region>, options: StrategyOptions) {
        dispatch!(self, s => s.init(region, options))
    }

    #[inline]
    fn alloc(&self, size: i32) -> Option<NonNull<Header>> {
        dispatch!(self, s => s.alloc(size))
    }

    #[inline]
    unsafe fn realloc(&self, header: NonNull<Header>, size: i32) -> Option<NonNull<Header>> {
        dispatch!(self, s => s.realloc(header, size))
    }

    #[inline]
    unsafe fn free(&self, header: NonNull<Header>) {
        dispatch!(self, s => s.free(header))
    }

    fn clear(&self) {
        dispatch!(self, s => s.clear())
    }

    fn shutdown(&mut self) {
        dispatch!(self, s => s.shutdown())
    }
}

/// Copy the payload of a block that moved.
///
/// Copies `min(old_usable, new_usable)` bytes from after the old header to
/// after the new one, using an overlap-safe move when the ranges alias.
///
/// # Safety
///
/// Both headers must start blocks of at least `HEADER_SIZE + *_usable`
/// bytes inside live memory.
pub(crate) unsafe fn move_payload(
    old: NonNull<Header>,
    old_usable: usize,
    new: NonNull<Header>,
    new_usable: usize,
) {
    if old == new {
        return;
    }
    let src = crate::core::header::user_ptr(old).as_ptr();
    let dst = crate::core::header::user_ptr(new).as_ptr();
    let len = old_usable.min(new_usable);

    if crate::util::layout::overlaps(src as usize, len, dst as usize, len) {
        std::ptr::copy(src, dst, len);
    } else {
        std::ptr::copy_nonoverlapping(src, dst, len);
    }
}
