//! Diagnostic kinds and predefined codes.
//!
//! Mirrors rustc's diagnostic levels for familiar UX.

/// The severity level of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// A contract violation; always followed by a panic.
    Error,
    /// Something the caller should look at, not fatal.
    Warning,
}

impl DiagnosticKind {
    /// Get the display prefix for this kind.
    pub fn prefix(&self) -> &'static str {
        match self {
            DiagnosticKind::Error => "error",
            DiagnosticKind::Warning => "warning",
        }
    }
}

/// A diagnostic message with code, message, and optional context.
///
/// Diagnostic codes follow the pattern:
/// - `KA0xx` - Capacity and lifecycle
/// - `KA1xx` - Block and header misuse
/// - `KA2xx` - Tracking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Severity level.
    pub kind: DiagnosticKind,
    /// Diagnostic code (e.g., "KA001").
    pub code: &'static str,
    /// Primary message.
    pub message: &'static str,
    /// Optional fix suggestion.
    pub help: Option<&'static str>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub const fn error(code: &'static str, message: &'static str) -> Self {
        Self {
            kind: DiagnosticKind::Error,
            code,
            message,
            help: None,
        }
    }

    /// Create a new warning diagnostic.
    pub const fn warning(code: &'static str, message: &'static str) -> Self {
        Self {
            kind: DiagnosticKind::Warning,
            code,
            message,
            help: None,
        }
    }

    /// Add a help message to this diagnostic.
    pub const fn with_help(mut self, help: &'static str) -> Self {
        self.help = Some(help);
        self
    }
}

// =============================================================================
// KA0xx - Capacity and lifecycle
// =============================================================================

/// KA001: A strategy region could not satisfy a request.
pub const KA001: Diagnostic = Diagnostic::warning(
    "KA001",
    "allocator region exhausted, allocation failed"
).with_help("raise the kind's capacity in AllocConfig, or move the traffic to another kind");

/// KA002: A managed kind was used outside init/shutdown.
pub const KA002: Diagnostic = Diagnostic::error(
    "KA002",
    "allocator kind used while the registry is not initialized"
).with_help("call init() first; only General and Debug work before init()");

/// KA003: init/shutdown called out of order.
pub const KA003: Diagnostic = Diagnostic::error(
    "KA003",
    "registry lifecycle called out of order"
).with_help("init() and shutdown() must alternate, starting with init()");

/// KA004: Invalid configuration reached init().
pub const KA004: Diagnostic = Diagnostic::error(
    "KA004",
    "invalid allocator configuration"
).with_help("region capacities must fit an i32 and system-backed kinds take no region");

// =============================================================================
// KA1xx - Block and header misuse
// =============================================================================

/// KA101: A block header failed validation.
pub const KA101: Diagnostic = Diagnostic::error(
    "KA101",
    "corrupt block header"
).with_help("the pointer was not produced by this allocator, or was already freed");

/// KA102: realloc called with a kind that does not own the block.
pub const KA102: Diagnostic = Diagnostic::error(
    "KA102",
    "realloc kind does not match the block's owner"
).with_help("pass the kind the block was allocated with");

/// KA103: A pointer is not block-aligned.
pub const KA103: Diagnostic = Diagnostic::error(
    "KA103",
    "misaligned block pointer"
).with_help("only pass pointers returned by alloc/realloc");

/// KA104: Stack kind freed out of LIFO order.
pub const KA104: Diagnostic = Diagnostic::error(
    "KA104",
    "stack allocation freed out of order"
).with_help("free TemporaryStack blocks in reverse allocation order");

/// KA105: A negative byte count was requested.
pub const KA105: Diagnostic = Diagnostic::error(
    "KA105",
    "negative allocation size"
);

/// KA106: A block does not belong to the region it was routed to.
pub const KA106: Diagnostic = Diagnostic::error(
    "KA106",
    "block lies outside its owner's region"
).with_help("the block was likely allocated before the last shutdown()");

// =============================================================================
// KA2xx - Tracking
// =============================================================================

/// KA201: Allocations outstanding at shutdown.
pub const KA201: Diagnostic = Diagnostic::warning(
    "KA201",
    "allocations still live at shutdown"
).with_help("see the leak report returned by shutdown()");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_have_expected_kind() {
        assert_eq!(KA001.kind, DiagnosticKind::Warning);
        assert_eq!(KA101.kind, DiagnosticKind::Error);
        assert_eq!(KA201.kind, DiagnosticKind::Warning);
        assert!(KA105.help.is_none());
    }
}
