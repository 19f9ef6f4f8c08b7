//! # kindalloc
//!
//! Kind-routed memory allocation for engines and long-running services.
//!
//! One facade, five strategies, selected per request by an
//! [`AllocatorKind`]:
//!
//! | Kind            | Strategy                        | Freed by            |
//! |-----------------|---------------------------------|---------------------|
//! | `General`       | System allocator                | `free`              |
//! | `Scratch`       | Linear bump region              | `update()`          |
//! | `TemporaryStack`| LIFO stack region               | `free` or `update()`|
//! | `Pool`          | Thread-safe first-fit free list | `free`              |
//! | `Debug`         | System allocator, untracked     | `free`              |
//!
//! Every block carries a 16-byte header in front of the payload recording its
//! padded size and owning kind, so `free` and `realloc` find their way back
//! to the right strategy without being told.
//!
//! ## Features
//!
//! - `parking_lot`: faster locks
//! - `debug`: allocation backtraces in leak reports
//! - `diagnostics`: diagnostic output in release builds
//! - `log`: route lifecycle and diagnostic messages through the `log` crate
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use kindalloc::{AllocConfig, AllocatorKind, Allocators};
//!
//! let alloc = Allocators::with_leak_tracking(AllocConfig::default());
//! alloc.init();
//!
//! // Main loop
//! let temp = alloc.alloc(AllocatorKind::Scratch, 4096);
//! let node = alloc.alloc(AllocatorKind::Pool, 96);
//! // ... use them ...
//! alloc.free(node);
//! alloc.update(); // `temp` is gone now
//! # let _ = temp;
//!
//! let leaks = alloc.shutdown();
//! assert!(leaks.is_empty(), "{}", leaks);
//! ```

#[macro_use]
pub mod diagnostics;

pub mod api;
pub mod tracking;

mod allocators;
mod core;
mod sync;
mod util;

// Re-export public API at crate root for convenience
pub use api::alloc::Allocators;
pub use api::block::Block;
pub use api::config::AllocConfig;
pub use api::kind::AllocatorKind;
pub use api::stats::{AllocStats, KindStats};

pub use allocators::free_list::FreeRange;
pub use allocators::FREED_PATTERN;

// Tracking
pub use tracking::{AllocObserver, LeakEntry, LeakReport, LeakTracker, NoopObserver};

// Diagnostics - Core types and predefined codes
pub use diagnostics::{set_sink, suppress_diagnostics, CollectingSink, DiagnosticSink};
pub use diagnostics::{Diagnostic, DiagnosticKind};
pub use diagnostics::{KA001, KA002, KA003, KA004, KA101, KA102, KA103, KA104, KA105, KA106, KA201};

/// Commonly used items.
pub mod prelude {
    pub use crate::{AllocConfig, AllocatorKind, Allocators, Block, LeakTracker};
}
