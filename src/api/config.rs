//! Allocator configuration.

use crate::api::kind::AllocatorKind;
use crate::util::size::{kb, mb};

/// Configuration for the allocator registry.
///
/// Capacities are fixed for one init/shutdown cycle. System-backed kinds
/// (`General`, `Debug`) take no region and must keep a capacity of zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocConfig {
    /// Region size per kind, in bytes (rounded down to 16 at init).
    pub capacities: [usize; AllocatorKind::COUNT],

    /// Kinds whose region is cleared on every `update()`.
    pub per_frame: [bool; AllocatorKind::COUNT],

    /// Fill reclaimed memory with `0xCD` (default: on with the `debug` feature)
    pub poison_freed: bool,
}

impl Default for AllocConfig {
    fn default() -> Self {
        Self {
            capacities: [0, mb(1), mb(1), mb(64), 0],
            per_frame: [false, true, true, false, false],
            poison_freed: cfg!(feature = "debug"),
        }
    }
}

impl AllocConfig {
    /// Create a minimal config for testing or constrained environments.
    pub fn minimal() -> Self {
        Self {
            capacities: [0, kb(64), kb(64), mb(1), 0],
            ..Self::default()
        }
    }

    /// Region capacity for `kind`.
    pub fn capacity(&self, kind: AllocatorKind) -> usize {
        self.capacities[kind.index()]
    }

    /// Whether `kind` is cleared every tick.
    pub fn is_per_frame(&self, kind: AllocatorKind) -> bool {
        self.per_frame[kind.index()]
    }

    /// Builder pattern: set a kind's region capacity.
    pub fn with_capacity(mut self, kind: AllocatorKind, bytes: usize) -> Self {
        self.capacities[kind.index()] = bytes;
        self
    }

    /// Builder pattern: mark a kind as cleared every tick.
    pub fn with_per_frame(mut self, kind: AllocatorKind, per_frame: bool) -> Self {
        self.per_frame[kind.index()] = per_frame;
        self
    }

    /// Builder pattern: enable poisoning of reclaimed memory.
    pub fn with_poison(mut self, enable: bool) -> Self {
        self.poison_freed = enable;
        self
    }

    /// First configuration problem, if any.
    pub(crate) fn validate(&self) -> Result<(), String> {
        for kind in AllocatorKind::ALL {
            let capacity = self.capacity(kind);
            if kind.is_unmanaged() && capacity != 0 {
                return Err(format!("{} is system-backed but has capacity {}", kind, capacity));
            }
            if capacity > i32::MAX as usize {
                return Err(format!("{} capacity {} exceeds i32::MAX", kind, capacity));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table() {
        let config = AllocConfig::default();
        assert_eq!(config.capacity(AllocatorKind::Pool), 64 << 20);
        assert_eq!(config.capacity(AllocatorKind::General), 0);
        assert!(config.is_per_frame(AllocatorKind::Scratch));
        assert!(config.is_per_frame(AllocatorKind::TemporaryStack));
        assert!(!config.is_per_frame(AllocatorKind::Pool));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_capacities() {
        let config = AllocConfig::default().with_capacity(AllocatorKind::Debug, 4096);
        assert!(config.validate().is_err());

        let config = AllocConfig::default().with_capacity(AllocatorKind::Pool, usize::MAX);
        assert!(config.validate().is_err());
    }
}
