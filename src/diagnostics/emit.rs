//! Diagnostic emission backend.
//!
//! Handles outputting diagnostics to stderr, logs, or a custom sink.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use super::kind::{Diagnostic, DiagnosticKind};

/// Global flag to suppress diagnostic output (for testing).
static DIAGNOSTICS_SUPPRESSED: AtomicBool = AtomicBool::new(false);

/// Optional process-wide sink that receives every emitted diagnostic.
static SINK: RwLock<Option<Arc<dyn DiagnosticSink>>> = RwLock::new(None);

/// Suppress stderr/log output of diagnostics. Sinks still receive them.
pub fn suppress_diagnostics(suppress: bool) {
    DIAGNOSTICS_SUPPRESSED.store(suppress, Ordering::Relaxed);
}

/// Check if diagnostics are suppressed.
pub fn is_suppressed() -> bool {
    DIAGNOSTICS_SUPPRESSED.load(Ordering::Relaxed)
}

/// Install (or remove) the process-wide diagnostic sink.
pub fn set_sink(sink: Option<Arc<dyn DiagnosticSink>>) {
    let mut slot = SINK.write().unwrap_or_else(|e| e.into_inner());
    *slot = sink;
}

/// Emit a diagnostic with runtime context.
///
/// In release builds without the `diagnostics` feature, stderr output is
/// skipped. With the `log` feature, diagnostics are also forwarded to `log`.
pub fn emit(diag: &Diagnostic, context: &str) {
    if let Some(sink) = SINK.read().unwrap_or_else(|e| e.into_inner()).as_ref() {
        sink.emit(diag, context);
    }

    if is_suppressed() {
        return;
    }

    #[cfg(any(debug_assertions, feature = "diagnostics"))]
    {
        emit_to_stderr(diag, context);
    }

    #[cfg(feature = "log")]
    {
        emit_to_log(diag, context);
    }
}

/// Internal: emit to stderr.
#[cfg(any(debug_assertions, feature = "diagnostics"))]
fn emit_to_stderr(diag: &Diagnostic, context: &str) {
    use std::io::Write;

    let mut stderr = std::io::stderr().lock();

    let _ = writeln!(
        stderr,
        "[kindalloc][{}] {}: {}",
        diag.code,
        diag.kind.prefix(),
        diag.message
    );

    if !context.is_empty() {
        let _ = writeln!(stderr, "  context: {}", context);
    }

    if let Some(thread) = std::thread::current().name() {
        let _ = writeln!(stderr, "  thread: {}", thread);
    }

    if let Some(help) = diag.help {
        let _ = writeln!(stderr, "  help: {}", help);
    }
}

/// Emit a diagnostic using the log crate.
#[cfg(feature = "log")]
fn emit_to_log(diag: &Diagnostic, context: &str) {
    match diag.kind {
        DiagnosticKind::Error => {
            log::error!("[{}] {}: {}", diag.code, diag.message, context);
        }
        DiagnosticKind::Warning => {
            log::warn!("[{}] {}: {}", diag.code, diag.message, context);
        }
    }

    if let Some(help) = diag.help {
        log::info!("  help: {}", help);
    }
}

/// Emit an error diagnostic and panic.
///
/// Used for contract violations: foreign or freed pointers, lifecycle
/// misuse, invalid kinds. These are bugs in the caller, not conditions to
/// recover from.
#[cold]
#[track_caller]
pub fn fatal(diag: &Diagnostic, context: &str) -> ! {
    debug_assert_eq!(diag.kind, DiagnosticKind::Error);
    emit(diag, context);
    panic!("[kindalloc][{}] {}: {}", diag.code, diag.message, context);
}

/// A diagnostic sink trait for custom output.
pub trait DiagnosticSink: Send + Sync {
    /// Handle a diagnostic.
    fn emit(&self, diag: &Diagnostic, context: &str);
}

/// A simple sink that collects diagnostics.
#[derive(Default)]
pub struct CollectingSink {
    diagnostics: Mutex<Vec<(Diagnostic, String)>>,
}

impl CollectingSink {
    /// Create a new collecting sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all collected diagnostics with their context.
    pub fn diagnostics(&self) -> Vec<(Diagnostic, String)> {
        self.diagnostics.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Whether a diagnostic with `code` was collected.
    pub fn contains(&self, code: &str) -> bool {
        self.diagnostics
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .any(|(d, _)| d.code == code)
    }

    /// Clear collected diagnostics.
    pub fn clear(&self) {
        self.diagnostics.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

impl DiagnosticSink for CollectingSink {
    fn emit(&self, diag: &Diagnostic, context: &str) {
        self.diagnostics
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((diag.clone(), context.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::kind::{KA001, KA101};

    #[test]
    fn test_collecting_sink() {
        let sink = CollectingSink::new();
        sink.emit(&KA001, "pool: 64 bytes");

        assert_eq!(sink.diagnostics().len(), 1);
        assert!(sink.contains("KA001"));
        assert!(!sink.contains("KA101"));

        sink.clear();
        assert!(sink.diagnostics().is_empty());
    }

    #[test]
    #[should_panic(expected = "[kindalloc][KA101]")]
    fn test_fatal_panics_with_code() {
        fatal(&KA101, "test");
    }
}
