//! Diagnostic emission backend.
//!
//! Handles outputting diagnostics to stderr, logs, or custom sinks.

use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};

use super::kind::{Diagnostic, DiagnosticKind};
use crate::sync::mutex::Mutex;

/// Global flag to suppress diagnostic output.
static DIAGNOSTICS_SUPPRESSED: AtomicBool = AtomicBool::new(false);

/// Global flag to enable verbose diagnostics.
static VERBOSE_DIAGNOSTICS: AtomicBool = AtomicBool::new(false);

/// Where diagnostics go when no sink is installed.
static ROUTE: AtomicU8 = AtomicU8::new(DiagnosticRoute::DEFAULT as u8);

/// Custom sink, checked before the route.
static SINK: OnceLock<Mutex<Option<Arc<dyn DiagnosticSink>>>> = OnceLock::new();

/// Output channel used when no custom sink is installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DiagnosticRoute {
    /// Write to standard error.
    Stderr = 0,
    /// Forward to the `log` crate. Falls back to stderr without the `log` feature.
    Log = 1,
}

impl DiagnosticRoute {
    /// Route in effect until one is installed: `Log` with the `log` feature.
    pub const DEFAULT: Self = if cfg!(feature = "log") {
        DiagnosticRoute::Log
    } else {
        DiagnosticRoute::Stderr
    };
}

impl From<u8> for DiagnosticRoute {
    fn from(val: u8) -> Self {
        match val {
            1 => DiagnosticRoute::Log,
            _ => DiagnosticRoute::Stderr,
        }
    }
}

/// Whether this build reports diagnostics at all.
///
/// True in debug builds, and in release builds with the `diagnostics` feature.
pub const fn build_enabled() -> bool {
    cfg!(any(debug_assertions, feature = "diagnostics"))
}

/// Suppress all diagnostic output.
pub fn suppress_diagnostics(suppress: bool) {
    DIAGNOSTICS_SUPPRESSED.store(suppress, Ordering::Relaxed);
}

/// Check if diagnostics are suppressed.
pub fn is_suppressed() -> bool {
    DIAGNOSTICS_SUPPRESSED.load(Ordering::Relaxed)
}

/// Enable verbose diagnostic output.
pub fn set_verbose(verbose: bool) {
    VERBOSE_DIAGNOSTICS.store(verbose, Ordering::Relaxed);
}

/// Check if verbose output is on.
pub fn is_verbose() -> bool {
    VERBOSE_DIAGNOSTICS.load(Ordering::Relaxed)
}

/// Select the output channel.
pub fn set_route(route: DiagnosticRoute) {
    ROUTE.store(route as u8, Ordering::Relaxed);
}

/// Current output channel.
pub fn route() -> DiagnosticRoute {
    DiagnosticRoute::from(ROUTE.load(Ordering::Relaxed))
}

/// Whether a diagnostic emitted now would be reported anywhere.
///
/// Callers check this before formatting a message.
pub fn enabled() -> bool {
    build_enabled() && !is_suppressed()
}

fn sink_slot() -> &'static Mutex<Option<Arc<dyn DiagnosticSink>>> {
    SINK.get_or_init(|| Mutex::new(None))
}

/// Install a custom sink, returning the previous one.
///
/// Pass `None` to go back to the configured route.
pub fn set_sink(sink: Option<Arc<dyn DiagnosticSink>>) -> Option<Arc<dyn DiagnosticSink>> {
    std::mem::replace(&mut *sink_slot().lock(), sink)
}

/// Emit a diagnostic.
///
/// In release builds without the `diagnostics` feature, this is a no-op.
/// Emission never fails and never panics.
pub fn emit(diag: &Diagnostic) {
    if !enabled() {
        return;
    }

    let sink = sink_slot().lock().clone();
    if let Some(sink) = sink {
        sink.emit(diag);
        return;
    }

    match route() {
        #[cfg(feature = "log")]
        DiagnosticRoute::Log => emit_to_log(diag),
        _ => emit_to_stderr(diag),
    }
}

/// Format a diagnostic as it appears on stderr.
///
/// The first line is `[managedalloc][CODE] kind: message`. Verbose output
/// appends indented `note:` and `help:` lines when present.
pub(crate) fn render(diag: &Diagnostic, verbose: bool) -> String {
    let mut out = format!(
        "[managedalloc][{}] {}: {}",
        diag.code,
        diag.kind.prefix(),
        diag.message
    );

    if verbose {
        if let Some(note) = diag.note {
            out.push_str("\n  note: ");
            out.push_str(note);
        }
        if let Some(help) = diag.help {
            out.push_str("\n  help: ");
            out.push_str(help);
        }
    }

    out
}

/// Internal: emit to stderr.
fn emit_to_stderr(diag: &Diagnostic) {
    let text = render(diag, is_verbose());
    let _ = writeln!(std::io::stderr().lock(), "{}", text);
}

/// Emit a diagnostic using the log crate.
#[cfg(feature = "log")]
fn emit_to_log(diag: &Diagnostic) {
    let text = render(diag, is_verbose());
    match diag.kind {
        DiagnosticKind::Error => log::error!("{}", text),
        DiagnosticKind::Warning => log::warn!("{}", text),
        DiagnosticKind::Note | DiagnosticKind::Help => log::info!("{}", text),
    }
}

/// A diagnostic sink trait for custom output.
pub trait DiagnosticSink: Send + Sync {
    /// Handle a diagnostic.
    fn emit(&self, diag: &Diagnostic);
}

/// A simple sink that collects diagnostics.
#[derive(Default)]
pub struct CollectingSink {
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl CollectingSink {
    /// Create a new collecting sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all collected diagnostics.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.lock().clone()
    }

    /// Collected diagnostics carrying `code`.
    pub fn with_code(&self, code: &str) -> Vec<Diagnostic> {
        self.diagnostics
            .lock()
            .iter()
            .filter(|d| d.code == code)
            .cloned()
            .collect()
    }

    /// Clear collected diagnostics.
    pub fn clear(&self) {
        self.diagnostics.lock().clear();
    }

    /// Check if any errors were collected.
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .lock()
            .iter()
            .any(|d| d.kind == DiagnosticKind::Error)
    }
}

impl DiagnosticSink for CollectingSink {
    fn emit(&self, diag: &Diagnostic) {
        self.diagnostics.lock().push(diag.clone());
    }
}
