//! The allocation facade.

use std::sync::Arc;

use crate::allocators::free_list::FreeRange;
use crate::allocators::SubAllocator;
use crate::api::block::Block;
use crate::api::config::AllocConfig;
use crate::api::kind::AllocatorKind;
use crate::api::stats::{AllocStats, KindCounters};
use crate::core::header::{self, pad_request};
use crate::core::registry::Registry;
use crate::diagnostics::{emit, fatal, KA001, KA102, KA103, KA105, KA201};
use crate::sync::mutex::RwLock;
use crate::tracking::{AllocObserver, LeakReport, LeakTracker, NoopObserver};
use crate::util::layout::is_aligned;

/// State shared by every clone of an [`Allocators`].
struct Shared<O> {
    config: AllocConfig,
    registry: RwLock<Registry>,
    counters: [KindCounters; AllocatorKind::COUNT],
    observer: O,
}

/// The kind-routed allocation facade.
///
/// One context object owns the registry of strategies, their regions and
/// the allocation observer. It is cheap to clone (internally uses `Arc`)
/// and thread-safe: the pool kind may be hit from any number of threads,
/// while the scratch and stack kinds are meant to be confined to one
/// thread per tick.
///
/// The lifecycle is `init()`, then any number of `update()` ticks, then
/// `shutdown()`. `General` and `Debug` work outside that window too.
///
/// # Example
///
/// ```rust,no_run
/// use kindalloc::{AllocConfig, AllocatorKind, Allocators};
///
/// let alloc = Allocators::new(AllocConfig::default());
/// alloc.init();
///
/// let block = alloc.alloc(AllocatorKind::Pool, 256).expect("pool exhausted");
/// let block = alloc.realloc(AllocatorKind::Pool, Some(block), 1024);
/// alloc.free(block);
///
/// alloc.update();
/// let leaks = alloc.shutdown();
/// assert!(leaks.is_empty());
/// ```
pub struct Allocators<O: AllocObserver = NoopObserver> {
    inner: Arc<Shared<O>>,
}

impl<O: AllocObserver> Clone for Allocators<O> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Allocators<NoopObserver> {
    /// Create an uninitialized facade with the given configuration.
    pub fn new(config: AllocConfig) -> Self {
        Self::with_observer(config, NoopObserver)
    }

    /// Create an uninitialized facade with the default configuration.
    pub fn with_defaults() -> Self {
        Self::new(AllocConfig::default())
    }
}

impl Allocators<LeakTracker> {
    /// Create an uninitialized facade that records live allocations and
    /// reports the survivors at shutdown.
    pub fn with_leak_tracking(config: AllocConfig) -> Self {
        Self::with_observer(config, LeakTracker::new())
    }
}

impl<O: AllocObserver> Allocators<O> {
    /// Create an uninitialized facade reporting to `observer`.
    pub fn with_observer(config: AllocConfig, observer: O) -> Self {
        Self {
            inner: Arc::new(Shared {
                registry: RwLock::new(Registry::new(&config)),
                config,
                counters: Default::default(),
                observer,
            }),
        }
    }

    // ==================== Lifecycle ====================

    /// Acquire every region and attach the strategies.
    ///
    /// Panics if already initialized.
    pub fn init(&self) {
        let mut registry = self.inner.registry.write();
        registry.init(&self.inner.config);
        ka_log!(info, "allocator registry initialized");
    }

    /// Advance one tick: clear every per-frame kind.
    ///
    /// Every block from those kinds becomes invalid. Panics if not
    /// initialized.
    pub fn update(&self) {
        let registry = self.inner.registry.read();
        for kind in registry.update() {
            self.counters(kind).record_clear();
            if kind.is_tracked() {
                self.inner.observer.on_clear(kind);
            }
        }
    }

    /// Detach the strategies, release every region and report what is
    /// still live.
    ///
    /// Blocks of managed kinds are invalid afterwards; `General` and
    /// `Debug` blocks stay usable. Panics if not initialized.
    pub fn shutdown(&self) -> LeakReport {
        {
            let mut registry = self.inner.registry.write();
            registry.shutdown();
        }
        for kind in AllocatorKind::ALL.into_iter().filter(|k| !k.is_unmanaged()) {
            self.counters(kind).record_clear();
            // Per-frame blocks die with every tick; they are never leaks.
            if self.inner.config.is_per_frame(kind) {
                self.inner.observer.on_clear(kind);
            }
        }

        let report = self.inner.observer.drain();
        if report.is_empty() {
            ka_log!(info, "allocator registry shut down cleanly");
        } else {
            emit(
                &KA201,
                &format!("{} allocations, {} bytes", report.len(), report.total_bytes()),
            );
            ka_log!(warn, "{}", report);
        }
        report
    }

    /// Whether `init` has run without a matching `shutdown`.
    pub fn is_initialized(&self) -> bool {
        self.inner.registry.read().is_initialized()
    }

    // ==================== Allocation ====================

    /// Allocate `bytes` from `kind`.
    ///
    /// Returns `None` for a zero-byte request and when the kind's region is
    /// exhausted. The block is 16-byte aligned and holds at least `bytes`
    /// bytes.
    ///
    /// Panics on a negative size, or on a managed kind outside
    /// `init()`/`shutdown()`.
    pub fn alloc(&self, kind: AllocatorKind, bytes: i32) -> Option<Block> {
        check_size(bytes);
        if bytes == 0 {
            return None;
        }

        let registry = self.inner.registry.read();
        let slot = registry.slot(kind);

        let Some(size) = pad_request(bytes) else {
            return self.exhausted(kind, bytes);
        };
        let Some(hdr) = slot.backend().alloc(size) else {
            return self.exhausted(kind, bytes);
        };

        // SAFETY: the strategy just wrote a header there.
        let size = unsafe { header::stamp(hdr, size, kind) };
        let block = checked_block(Block::new(header::user_ptr(hdr)));

        self.counters(kind).record_alloc(size as usize);
        if kind.is_tracked() {
            self.inner.observer.on_alloc(block.addr(), size as usize, kind);
        }
        Some(block)
    }

    /// Allocate `bytes` from `kind` and zero them.
    pub fn calloc(&self, kind: AllocatorKind, bytes: i32) -> Option<Block> {
        let block = self.alloc(kind, bytes)?;
        // SAFETY: fresh block of at least `bytes` usable bytes.
        unsafe { std::ptr::write_bytes(block.as_ptr(), 0, bytes as usize) };
        Some(block)
    }

    /// Resize a block.
    ///
    /// - `None` behaves as [`alloc`](Self::alloc).
    /// - `bytes == 0` frees the block and returns `None`.
    /// - A request that pads to the current block size returns the block
    ///   unchanged.
    /// - Otherwise the owning strategy resizes it, in place or by moving; the
    ///   first `min(old, new)` payload bytes are preserved.
    ///
    /// The address may change on any resize, shrinking included. If `None`
    /// comes back from a resize, the old block has been released: it is
    /// never valid after a size-changing call.
    ///
    /// Panics if `kind` is not the block's owner.
    pub fn realloc(&self, kind: AllocatorKind, block: Option<Block>, bytes: i32) -> Option<Block> {
        let Some(block) = block else {
            return self.alloc(kind, bytes);
        };
        check_size(bytes);
        if bytes == 0 {
            self.free(Some(block));
            return None;
        }

        let old = header::read(block);
        let owner = old.checked_kind();
        if owner != kind {
            fatal(
                &KA102,
                &format!("block {:?} is owned by {}, realloc asked for {}", block, owner, kind),
            );
        }

        let Some(size) = pad_request(bytes) else {
            self.free(Some(block));
            return self.exhausted(owner, bytes);
        };
        if size == old.size {
            return Some(block);
        }

        let registry = self.inner.registry.read();
        let slot = registry.slot(owner);

        // SAFETY: the header validated above belongs to a live block of `owner`.
        let Some(hdr) = (unsafe { slot.backend().realloc(header::of(block), size) }) else {
            self.counters(owner).record_free(old.size as usize);
            if owner.is_tracked() {
                self.inner.observer.on_free(block.addr());
            }
            return self.exhausted(owner, bytes);
        };

        // SAFETY: the strategy returned a live block header.
        let size = unsafe { header::stamp(hdr, size, owner) };
        let moved = checked_block(Block::new(header::user_ptr(hdr)));

        self.counters(owner).record_realloc(old.size as usize, size as usize);
        if owner.is_tracked() {
            self.inner
                .observer
                .on_realloc(block.addr(), moved.addr(), size as usize, owner);
        }
        Some(moved)
    }

    /// Release a block. `None` is a no-op.
    ///
    /// Panics if the block's header is corrupt, i.e. the block was not
    /// produced by this facade or was already freed.
    pub fn free(&self, block: Option<Block>) {
        let Some(block) = block else {
            return;
        };

        let hdr = header::read(block);
        let kind = hdr.checked_kind();

        let registry = self.inner.registry.read();
        let slot = registry.slot(kind);

        // Untrack first: once the strategy has the bytes back, another thread
        // may be handed the same address.
        if kind.is_tracked() {
            self.inner.observer.on_free(block.addr());
        }
        self.counters(kind).record_free(hdr.size as usize);

        // SAFETY: validated header of a live block owned by `kind`.
        unsafe { slot.backend().free(header::of(block)) };
    }

    // ==================== Introspection ====================

    /// Payload bytes available in `block`.
    pub fn usable_size(&self, block: Block) -> i32 {
        let hdr = header::read(block);
        hdr.checked_kind();
        hdr.usable()
    }

    /// The kind that owns `block`.
    pub fn kind_of(&self, block: Block) -> AllocatorKind {
        header::read(block).checked_kind()
    }

    /// Current allocation statistics.
    pub fn stats(&self) -> AllocStats {
        let registry = self.inner.registry.read();
        let mut stats = AllocStats::default();
        for kind in AllocatorKind::ALL {
            stats.kinds[kind.index()] = self.counters(kind).snapshot(registry.available(kind));
        }
        stats
    }

    /// Free ranges of a pool-backed kind, in offset order.
    ///
    /// Empty for other kinds and while uninitialized.
    pub fn pool_free_ranges(&self, kind: AllocatorKind) -> Vec<FreeRange> {
        self.inner.registry.read().free_ranges(kind)
    }

    /// The configuration this facade was built with.
    pub fn config(&self) -> &AllocConfig {
        &self.inner.config
    }

    /// The allocation observer.
    pub fn observer(&self) -> &O {
        &self.inner.observer
    }

    // ==================== Internals ====================

    #[inline]
    fn counters(&self, kind: AllocatorKind) -> &KindCounters {
        &self.inner.counters[kind.index()]
    }

    #[cold]
    fn exhausted(&self, kind: AllocatorKind, bytes: i32) -> Option<Block> {
        self.counters(kind).record_failure();
        emit(&KA001, &format!("{}: {} bytes", kind, bytes));
        None
    }
}

impl Default for Allocators<NoopObserver> {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[inline]
fn check_size(bytes: i32) {
    if bytes < 0 {
        fatal(&KA105, &format!("requested {} bytes", bytes));
    }
}

#[inline]
fn checked_block(block: Block) -> Block {
    if !is_aligned(block.addr()) {
        fatal(&KA103, &format!("strategy returned {:?}", block));
    }
    block
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::header::HEADER_SIZE;

    fn initialized() -> Allocators {
        let alloc = Allocators::new(AllocConfig::minimal());
        alloc.init();
        alloc
    }

    #[test]
    fn test_alloc_stamps_header() {
        let alloc = initialized();

        for kind in AllocatorKind::ALL {
            let block = alloc.alloc(kind, 100).unwrap();
            let hdr = header::read(block);
            assert!(is_aligned(block.addr()));
            assert_eq!(hdr.checked_kind(), kind);
            assert!(hdr.size as usize >= 100 + HEADER_SIZE);
            assert_eq!(hdr.size % 16, 0);
            alloc.free(Some(block));
        }
        alloc.shutdown();
    }

    #[test]
    fn test_zero_bytes_is_none() {
        let alloc = initialized();
        for kind in AllocatorKind::ALL {
            assert!(alloc.alloc(kind, 0).is_none());
        }
        alloc.shutdown();
    }

    #[test]
    fn test_realloc_same_size_is_noop() {
        let alloc = initialized();

        let block = alloc.alloc(AllocatorKind::Pool, 40).unwrap();
        let usable = alloc.usable_size(block);
        assert_eq!(usable, 48);

        let same = alloc.realloc(AllocatorKind::Pool, Some(block), usable).unwrap();
        assert_eq!(same, block);
        alloc.free(Some(same));
        alloc.shutdown();
    }

    #[test]
    fn test_realloc_zero_frees() {
        let alloc = initialized();

        let block = alloc.alloc(AllocatorKind::Pool, 64).unwrap();
        assert!(alloc.realloc(AllocatorKind::Pool, Some(block), 0).is_none());
        assert_eq!(alloc.pool_free_ranges(AllocatorKind::Pool).len(), 1);
        alloc.shutdown();
    }

    #[test]
    fn test_calloc_zeroes() {
        let alloc = initialized();

        let dirty = alloc.alloc(AllocatorKind::Scratch, 64).unwrap();
        unsafe { std::ptr::write_bytes(dirty.as_ptr(), 0xEE, 64) };
        alloc.update();

        let clean = alloc.calloc(AllocatorKind::Scratch, 64).unwrap();
        assert_eq!(clean, dirty);
        assert!(unsafe { clean.as_slice(64) }.iter().all(|&b| b == 0));
        alloc.shutdown();
    }

    #[test]
    #[should_panic(expected = "KA102")]
    fn test_realloc_kind_mismatch_is_fatal() {
        let alloc = initialized();
        let block = alloc.alloc(AllocatorKind::Pool, 64).unwrap();
        alloc.realloc(AllocatorKind::General, Some(block), 128);
    }

    #[test]
    #[should_panic(expected = "KA105")]
    fn test_negative_size_is_fatal() {
        let alloc = initialized();
        alloc.alloc(AllocatorKind::General, -1);
    }

    #[test]
    #[should_panic(expected = "KA002")]
    fn test_managed_kind_before_init_is_fatal() {
        let alloc = Allocators::new(AllocConfig::minimal());
        alloc.alloc(AllocatorKind::Scratch, 16);
    }

    #[test]
    fn test_stats_follow_traffic() {
        let alloc = initialized();

        let a = alloc.alloc(AllocatorKind::Pool, 64).unwrap();
        let b = alloc.realloc(AllocatorKind::Pool, Some(a), 200).unwrap();
        assert!(alloc.alloc(AllocatorKind::Scratch, 1 << 20).is_none());

        let stats = alloc.stats();
        let pool = stats.kind(AllocatorKind::Pool);
        assert_eq!(pool.live_bytes, 224);
        assert_eq!(pool.alloc_count, 2);
        assert_eq!(pool.free_count, 1);
        assert_eq!(stats.kind(AllocatorKind::Scratch).failed_count, 1);

        alloc.free(Some(b));
        assert_eq!(alloc.stats().kind(AllocatorKind::Pool).live_bytes, 0);
        alloc.shutdown();
    }
}
