//! Compiler errors and warnings reported per unit.
//!
//! Engines push diagnostics into a [`DiagnosticListener`]. The pipeline
//! does not interpret them; it wraps the host's listener in a
//! [`DiagnosticCounter`] that learns which units had errors and holds each
//! unit's diagnostics back until that unit is committed.

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::base::{Position, UnitId};

// ============================================================================
// DIAGNOSTIC TYPES
// ============================================================================

/// Severity level of a diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
    Info,
    Hint,
}

/// A diagnostic message with location.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    /// The unit containing this diagnostic.
    pub unit: UnitId,
    pub severity: Severity,
    pub message: Arc<str>,
    pub position: Position,
}

/// Receives diagnostics as the engine discovers them.
pub trait DiagnosticListener: Send + Sync {
    fn record(&self, unit: UnitId, severity: Severity, message: &str, position: Position);
}

/// Drops every diagnostic.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullDiagnostics;

impl DiagnosticListener for NullDiagnostics {
    fn record(&self, _unit: UnitId, _severity: Severity, _message: &str, _position: Position) {}
}

// ============================================================================
// DIAGNOSTIC COLLECTOR
// ============================================================================

/// Keeps every diagnostic in memory.
#[derive(Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl DiagnosticCollector {
    /// Create a new empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all diagnostics recorded so far.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.lock().clone()
    }

    /// Get diagnostics for a specific unit.
    pub fn diagnostics_for_unit(&self, unit: UnitId) -> Vec<Diagnostic> {
        self.diagnostics
            .lock()
            .iter()
            .filter(|d| d.unit == unit)
            .cloned()
            .collect()
    }

    /// Get the number of errors.
    pub fn error_count(&self) -> usize {
        self.diagnostics
            .lock()
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    /// Take all diagnostics, leaving the collector empty.
    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.diagnostics.lock())
    }
}

impl DiagnosticListener for DiagnosticCollector {
    fn record(&self, unit: UnitId, severity: Severity, message: &str, position: Position) {
        self.diagnostics.lock().push(Diagnostic {
            unit,
            severity,
            message: Arc::from(message),
            position,
        });
    }
}

// ============================================================================
// DIAGNOSTIC COUNTER
// ============================================================================

/// Buffers one worker run's diagnostics per unit and counts its errors.
///
/// Nothing reaches the host listener until [`publish`](Self::publish) is
/// called for the unit, which workers do right after committing it.
/// Diagnostics of units that never commit are dropped by
/// [`clear`](Self::clear).
pub struct DiagnosticCounter {
    inner: Arc<dyn DiagnosticListener>,
    pending: Mutex<FxHashMap<UnitId, Vec<Diagnostic>>>,
}

impl DiagnosticCounter {
    pub fn new(inner: Arc<dyn DiagnosticListener>) -> Self {
        Self {
            inner,
            pending: Mutex::new(FxHashMap::default()),
        }
    }

    /// Errors held for `unit` and not yet published.
    pub fn errors_in(&self, unit: UnitId) -> usize {
        self.pending.lock().get(&unit).map_or(0, |held| {
            held.iter()
                .filter(|d| d.severity == Severity::Error)
                .count()
        })
    }

    pub fn has_errors(&self, unit: UnitId) -> bool {
        self.errors_in(unit) > 0
    }

    /// Forward everything held for `unit` to the host listener.
    pub fn publish(&self, unit: UnitId) {
        let held = self.pending.lock().remove(&unit).unwrap_or_default();
        for d in held {
            self.inner.record(d.unit, d.severity, &d.message, d.position);
        }
    }

    /// Drop every held diagnostic, e.g. after the engine that produced them
    /// was discarded.
    pub fn clear(&self) {
        self.pending.lock().clear();
    }
}

impl DiagnosticListener for DiagnosticCounter {
    fn record(&self, unit: UnitId, severity: Severity, message: &str, position: Position) {
        self.pending.lock().entry(unit).or_default().push(Diagnostic {
            unit,
            severity,
            message: Arc::from(message),
            position,
        });
    }
}
