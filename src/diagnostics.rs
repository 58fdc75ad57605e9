// diagnostics.rs -- Injected logging capability.
//
// Failures in this crate never propagate as panics past the public
// boundary; they are turned into a sentinel return value plus one
// `Diagnostic` handed to a `DiagnosticSink`. The sink is passed in by
// the embedder rather than reached through a global, so tests can
// capture exactly what was reported.
//
//   TracingSink  forwards to `tracing` (the default)
//   MemorySink   keeps records in memory for inspection

use std::fmt;
use std::sync::{Arc, Mutex};

/// Which part of the crate produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    FrameTransformer,
    RenderSetup,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::FrameTransformer => write!(f, "frame-transformer"),
            Component::RenderSetup => write!(f, "render-setup"),
        }
    }
}

/// One recorded failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub component: Component,
    pub message: String,
}

impl Diagnostic {
    pub fn new(component: Component, message: impl Into<String>) -> Self {
        Diagnostic { component, message: message.into() }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.component, self.message)
    }
}

/// Receives diagnostics. Implementations must be cheap to call and must
/// not panic.
pub trait DiagnosticSink: Send + Sync {
    fn record(&self, diagnostic: Diagnostic);
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for Arc<S> {
    fn record(&self, diagnostic: Diagnostic) {
        (**self).record(diagnostic)
    }
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for &S {
    fn record(&self, diagnostic: Diagnostic) {
        (**self).record(diagnostic)
    }
}

/// Forwards every diagnostic to `tracing::error!`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn record(&self, diagnostic: Diagnostic) {
        tracing::error!(
            component = %diagnostic.component,
            "{}",
            diagnostic.message
        );
    }
}

/// Collects diagnostics in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<Diagnostic>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return everything recorded so far.
    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Diagnostic>> {
        // A panic while holding the lock cannot leave the Vec half-written,
        // so a poisoned lock is still safe to use.
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl DiagnosticSink for MemorySink {
    fn record(&self, diagnostic: Diagnostic) {
        self.lock().push(diagnostic);
    }
}
