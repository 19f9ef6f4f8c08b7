//! Diagnostics for allocator misuse and exhaustion.
//!
//! ## Diagnostic Codes
//!
//! | Code  | Meaning                        |
//! |-------|--------------------------------|
//! | KA0xx | Capacity and lifecycle         |
//! | KA1xx | Block and header misuse        |
//! | KA2xx | Tracking                       |
//!
//! Errors are always followed by a panic. Warnings are informational.

#[macro_use]
mod macros;

pub mod emit;
pub mod kind;

pub use emit::{emit, fatal, is_suppressed, set_sink, suppress_diagnostics, CollectingSink, DiagnosticSink};
pub use kind::{Diagnostic, DiagnosticKind};
pub use kind::{KA001, KA002, KA003, KA004, KA101, KA102, KA103, KA104, KA105, KA106, KA201};
