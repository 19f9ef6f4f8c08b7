//! Ledger of live allocations for leak reports.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use super::{AllocObserver, LeakReport};
use crate::api::kind::AllocatorKind;
use crate::sync::mutex::Mutex;

/// One live allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeakEntry {
    /// User-pointer address.
    pub address: usize,

    /// Block size in bytes, header included.
    pub size: usize,

    /// Owning kind.
    pub kind: AllocatorKind,

    /// Allocation sequence number; orders the report.
    pub id: u64,

    /// Captured backtrace (only with the `debug` feature).
    pub backtrace: Option<String>,
}

/// Observer that records every live block by address.
///
/// A realloc keeps the entry's `id` so a leak is reported against the
/// allocation that started it.
///
/// Between a strategy moving a block and the facade reporting the move,
/// another thread may already have been handed the old address. Such an
/// `on_alloc` parks the stale entry instead of overwriting it, and the
/// pending `on_realloc` (or the `on_free` of a failed realloc) picks it up
/// from there.
pub struct LeakTracker {
    ledger: Mutex<Ledger>,
    next_id: AtomicU64,
}

#[derive(Default)]
struct Ledger {
    live: HashMap<usize, LeakEntry>,
    moving: HashMap<usize, Vec<LeakEntry>>,
}

impl Ledger {
    fn insert(&mut self, entry: LeakEntry) {
        let address = entry.address;
        if let Some(stale) = self.live.insert(address, entry) {
            self.moving.entry(address).or_default().push(stale);
        }
    }

    fn take(&mut self, address: usize) -> Option<LeakEntry> {
        if let Some(parked) = self.moving.get_mut(&address) {
            let entry = parked.pop();
            if parked.is_empty() {
                self.moving.remove(&address);
            }
            if entry.is_some() {
                return entry;
            }
        }
        self.live.remove(&address)
    }
}

impl LeakTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self {
            ledger: Mutex::new(Ledger::default()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Number of live allocations.
    pub fn live_count(&self) -> usize {
        self.ledger.lock().live.len()
    }

    /// Entry for `address`, if it is live.
    pub fn get(&self, address: usize) -> Option<LeakEntry> {
        self.ledger.lock().live.get(&address).cloned()
    }

    /// Copy of the ledger without draining it.
    pub fn snapshot(&self) -> LeakReport {
        LeakReport::from_entries(self.ledger.lock().live.values().cloned().collect())
    }
}

#[cfg(feature = "debug")]
fn capture_backtrace() -> Option<String> {
    Some(format!("{:?}", backtrace::Backtrace::new()))
}

#[cfg(not(feature = "debug"))]
#[inline(always)]
fn capture_backtrace() -> Option<String> {
    None
}

impl Default for LeakTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl AllocObserver for LeakTracker {
    fn on_alloc(&self, address: usize, size: usize, kind: AllocatorKind) {
        let entry = LeakEntry {
            address,
            size,
            kind,
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            backtrace: capture_backtrace(),
        };
        self.ledger.lock().insert(entry);
    }

    fn on_realloc(&self, old: usize, new: usize, size: usize, kind: AllocatorKind) {
        let mut ledger = self.ledger.lock();
        let (id, backtrace) = match ledger.take(old) {
            Some(entry) => (entry.id, entry.backtrace),
            None => (self.next_id.fetch_add(1, Ordering::Relaxed), capture_backtrace()),
        };
        ledger.insert(LeakEntry {
            address: new,
            size,
            kind,
            id,
            backtrace,
        });
    }

    fn on_free(&self, address: usize) {
        self.ledger.lock().take(address);
    }

    fn on_clear(&self, kind: AllocatorKind) {
        let mut ledger = self.ledger.lock();
        ledger.live.retain(|_, e| e.kind != kind);
        ledger.moving.retain(|_, parked| {
            parked.retain(|e| e.kind != kind);
            !parked.is_empty()
        });
    }

    fn drain(&self) -> LeakReport {
        let ledger = std::mem::take(&mut *self.ledger.lock());
        let mut entries: Vec<LeakEntry> = ledger.live.into_values().collect();
        entries.extend(ledger.moving.into_values().flatten());
        LeakReport::from_entries(entries)
    }
}
