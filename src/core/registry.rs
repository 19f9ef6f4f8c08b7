//! Allocator registry - the fixed kind -> strategy table and its lifecycle.
//!
//! States: `Uninitialized -> Initialized -> Uninitialized`. Regions exist
//! only while initialized. System-backed slots work in both states.

use crate::allocators::free_list::FreeRange;
use crate::allocators::{Backend, StrategyOptions, SubAllocator};
use crate::api::config::AllocConfig;
use crate::api::kind::AllocatorKind;
use crate::core::region::Region;
use crate::diagnostics::{fatal, KA002, KA003, KA004};
use crate::util::layout::ALIGNMENT;
use crate::util::size::format_bytes;

/// One registry entry.
pub(crate) struct Slot {
    kind: AllocatorKind,
    capacity: usize,
    per_frame: bool,
    region: Option<Region>,
    backend: Backend,
}

impl Slot {
    fn new(kind: AllocatorKind, config: &AllocConfig) -> Self {
        Self {
            kind,
            capacity: config.capacity(kind) & !(ALIGNMENT - 1),
            per_frame: config.is_per_frame(kind),
            region: None,
            backend: Backend::for_kind(kind),
        }
    }

    /// The strategy serving this slot.
    #[inline]
    pub fn backend(&self) -> &Backend {
        &self.backend
    }
}

/// The registry table.
pub(crate) struct Registry {
    initialized: bool,
    options: StrategyOptions,
    slots: [Slot; AllocatorKind::COUNT],
}

impl Registry {
    /// An uninitialized registry for `config`.
    pub fn new(config: &AllocConfig) -> Self {
        let options = StrategyOptions {
            poison: config.poison_freed,
        };
        let mut slots = AllocatorKind::ALL.map(|kind| Slot::new(kind, config));
        for slot in &mut slots {
            if !slot.backend.needs_region() {
                slot.backend.init(None, options);
            }
        }

        Self {
            initialized: false,
            options,
            slots,
        }
    }

    /// Whether `init` has run without a matching `shutdown`.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Acquire every region and attach the strategies.
    pub fn init(&mut self, config: &AllocConfig) {
        if self.initialized {
            fatal(&KA003, "init() called while already initialized");
        }
        if let Err(problem) = config.validate() {
            fatal(&KA004, &problem);
        }

        for slot in &mut self.slots {
            slot.region = (slot.capacity > 0).then(|| Region::new(slot.capacity));
            slot.backend.init(slot.region.as_ref(), self.options);

            ka_log!(
                debug,
                "{} region: {}{}",
                slot.kind,
                format_bytes(slot.capacity),
                if slot.per_frame { " (per-frame)" } else { "" }
            );
        }
        self.initialized = true;
    }

    /// Clear every per-frame slot. Returns the kinds that were cleared.
    pub fn update(&self) -> Vec<AllocatorKind> {
        if !self.initialized {
            fatal(&KA002, "update() called before init()");
        }
        let mut cleared = Vec::new();
        for slot in self.slots.iter().filter(|slot| slot.per_frame) {
            slot.backend.clear();
            cleared.push(slot.kind);
        }
        cleared
    }

    /// Detach the strategies and release every region.
    pub fn shutdown(&mut self) {
        if !self.initialized {
            fatal(&KA003, "shutdown() called without a matching init()");
        }
        for slot in &mut self.slots {
            if slot.backend.needs_region() {
                slot.backend.shutdown();
            }
            slot.region = None;
        }
        self.initialized = false;
    }

    /// The slot for `kind`, asserting that it may be used now.
    #[inline]
    pub fn slot(&self, kind: AllocatorKind) -> &Slot {
        if !self.initialized && !kind.is_unmanaged() {
            fatal(&KA002, &format!("{} used while the registry is not initialized", kind));
        }
        &self.slots[kind.index()]
    }

    /// Free ranges of `kind`'s strategy (empty unless it is a pool).
    pub fn free_ranges(&self, kind: AllocatorKind) -> Vec<FreeRange> {
        self.slots[kind.index()].backend.free_ranges()
    }

    /// Bytes still available to `kind`, when known.
    pub fn available(&self, kind: AllocatorKind) -> Option<usize> {
        let slot = &self.slots[kind.index()];
        if slot.backend.needs_region() && !self.initialized {
            return Some(0);
        }
        slot.backend.available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle() {
        let config = AllocConfig::minimal();
        let mut registry = Registry::new(&config);
        assert!(!registry.is_initialized());

        registry.init(&config);
        assert!(registry.is_initialized());
        assert_eq!(registry.slot(AllocatorKind::Pool).capacity, 1 << 20);
        assert_eq!(registry.available(AllocatorKind::Scratch), Some(64 * 1024));

        let cleared = registry.update();
        assert_eq!(cleared, vec![AllocatorKind::Scratch, AllocatorKind::TemporaryStack]);

        registry.shutdown();
        assert!(!registry.is_initialized());
    }

    #[test]
    fn test_unmanaged_slots_work_before_init() {
        let registry = Registry::new(&AllocConfig::minimal());
        let slot = registry.slot(AllocatorKind::Debug);
        assert_eq!(slot.capacity, 0);
    }

    #[test]
    #[should_panic(expected = "KA002")]
    fn test_managed_slot_before_init_is_fatal() {
        let registry = Registry::new(&AllocConfig::minimal());
        registry.slot(AllocatorKind::Pool);
    }

    #[test]
    #[should_panic(expected = "KA003")]
    fn test_double_init_is_fatal() {
        let config = AllocConfig::minimal();
        let mut registry = Registry::new(&config);
        registry.init(&config);
        registry.init(&config);
    }

    #[test]
    #[should_panic(expected = "KA003")]
    fn test_shutdown_without_init_is_fatal() {
        let mut registry = Registry::new(&AllocConfig::minimal());
        registry.shutdown();
    }

    #[test]
    #[should_panic(expected = "KA004")]
    fn test_invalid_config_is_fatal() {
        let config = AllocConfig::minimal().with_capacity(AllocatorKind::General, 4096);
        let mut registry = Registry::new(&config);
        registry.init(&config);
    }
}
