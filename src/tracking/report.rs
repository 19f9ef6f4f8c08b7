//! Leak report emitted at shutdown.

use super::LeakEntry;
use crate::util::size::format_bytes;

/// Allocations that were never freed, in allocation order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeakReport {
    entries: Vec<LeakEntry>,
}

impl LeakReport {
    /// Build a report, ordering entries by allocation sequence.
    pub fn from_entries(mut entries: Vec<LeakEntry>) -> Self {
        entries.sort_by_key(|e| e.id);
        Self { entries }
    }

    /// Whether nothing leaked.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of leaked allocations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Leaked allocations.
    pub fn entries(&self) -> &[LeakEntry] {
        &self.entries
    }

    /// Whether `address` is among the leaks.
    pub fn contains(&self, address: usize) -> bool {
        self.entries.iter().any(|e| e.address == address)
    }

    /// Total leaked bytes.
    pub fn total_bytes(&self) -> usize {
        self.entries.iter().map(|e| e.size).sum()
    }
}

impl std::fmt::Display for LeakReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.entries.is_empty() {
            return writeln!(f, "[kindalloc] No active allocations (no leaks detected)");
        }

        writeln!(
            f,
            "[kindalloc] Leak report: {} active allocations, {}",
            self.entries.len(),
            format_bytes(self.total_bytes())
        )?;
        for entry in &self.entries {
            writeln!(
                f,
                "  #{:<6} {:#018x}  {:>10} bytes  {}",
                entry.id, entry.address, entry.size, entry.kind
            )?;
            if let Some(bt) = &entry.backtrace {
                writeln!(f, "{}", bt)?;
            }
        }
        Ok(())
    }
}
