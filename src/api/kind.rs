//! Allocator kinds - the tag that routes every request to a strategy.

/// Identifies which sub-allocator owns (or should serve) an allocation.
///
/// The discriminant is stored in every block header, so the set is closed
/// and `#[repr(u8)]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum AllocatorKind {
    /// General-purpose heap, backed by the system allocator.
    General = 0,
    /// Linear bump region, reset every tick.
    Scratch = 1,
    /// Stack-discipline region (LIFO frees), reset every tick.
    TemporaryStack = 2,
    /// Long-lived, thread-safe pooled heap with free-list reuse.
    Pool = 3,
    /// System allocator, untracked, usable outside init/shutdown.
    Debug = 4,
}

impl AllocatorKind {
    /// Number of kinds.
    pub const COUNT: usize = 5;

    /// Every kind, in registry order.
    pub const ALL: [AllocatorKind; Self::COUNT] = [
        AllocatorKind::General,
        AllocatorKind::Scratch,
        AllocatorKind::TemporaryStack,
        AllocatorKind::Pool,
        AllocatorKind::Debug,
    ];

    /// Registry slot of this kind.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Kind stored in registry slot `index`.
    pub const fn from_index(index: usize) -> Option<Self> {
        if index < Self::COUNT {
            Some(Self::ALL[index])
        } else {
            None
        }
    }

    /// Decode a header tag.
    #[inline]
    pub(crate) const fn from_tag(tag: u8) -> Option<Self> {
        Self::from_index(tag as usize)
    }

    /// Human-readable name.
    pub const fn name(self) -> &'static str {
        match self {
            AllocatorKind::General => "general",
            AllocatorKind::Scratch => "scratch",
            AllocatorKind::TemporaryStack => "temp-stack",
            AllocatorKind::Pool => "pool",
            AllocatorKind::Debug => "debug",
        }
    }

    /// Kinds that defer to the system allocator and may be used before
    /// `init()` and after `shutdown()`.
    #[inline]
    pub const fn is_unmanaged(self) -> bool {
        matches!(self, AllocatorKind::General | AllocatorKind::Debug)
    }

    /// Kinds whose traffic is reported to the allocation observer.
    #[inline]
    pub const fn is_tracked(self) -> bool {
        !matches!(self, AllocatorKind::Debug)
    }
}

impl std::fmt::Display for AllocatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_round_trip() {
        for kind in AllocatorKind::ALL {
            assert_eq!(AllocatorKind::from_index(kind.index()), Some(kind));
        }
        assert_eq!(AllocatorKind::from_index(AllocatorKind::COUNT), None);
        assert_eq!(AllocatorKind::from_tag(0xFF), None);
    }

    #[test]
    fn test_kind_properties() {
        assert!(AllocatorKind::General.is_unmanaged());
        assert!(AllocatorKind::Debug.is_unmanaged());
        assert!(!AllocatorKind::Pool.is_unmanaged());
        assert!(!AllocatorKind::Debug.is_tracked());
        assert!(AllocatorKind::Scratch.is_tracked());
    }
}
