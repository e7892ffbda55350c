//! Diagnostics for the symbolic model.
//!
//! The model never prints. Events worth surfacing to a user (a depth ceiling
//! tripping, an empty intersection, a value widened all the way to `any`, a
//! rejected capability cast) are pushed to a thread-local collector that the
//! host evaluator drains after an analysis pass.
//!
//! # Usage
//!
//! Diagnostics are disabled by default. Enable them via:
//! - `DiagnosticsCollector::enable()` - enable diagnostics collection
//! - `DiagnosticsCollector::disable()` - disable diagnostics collection
//! - `DiagnosticsCollector::take()` - retrieve and clear collected diagnostics

use std::cell::RefCell;
use std::fmt;

use serde::Serialize;

use crate::symbolic::Capability;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum DiagnosticReason {
    /// A test walk hit the recursion ceiling.
    MaxRecursionDepth(usize),

    /// An intersection hit its depth ceiling.
    MaxIntersectionDepth(usize),

    /// No value satisfies all the intersected constraints.
    EmptyIntersection,

    /// A value that cannot be widened further was replaced by `any`.
    WidenedToAny,

    /// Not every case of a multivalue (or the super value of a run-time
    /// value) implements the requested capability.
    CapabilityCastRejected(Capability),
}

impl fmt::Display for DiagnosticReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticReason::MaxRecursionDepth(depth) => {
                write!(f, "maximum recursion depth ({}) exceeded", depth)
            }
            DiagnosticReason::MaxIntersectionDepth(depth) => {
                write!(f, "maximum intersection depth ({}) exceeded", depth)
            }
            DiagnosticReason::EmptyIntersection => write!(f, "empty intersection"),
            DiagnosticReason::WidenedToAny => write!(f, "value widened to any"),
            DiagnosticReason::CapabilityCastRejected(capability) => {
                write!(f, "not every case is {}", capability)
            }
        }
    }
}

/// A single diagnostic.
#[derive(Clone, Debug, Serialize)]
pub struct SymbolicDiagnostic {
    pub reason: DiagnosticReason,
    /// Location path inside the compared values, e.g. `.foo[2]`.
    pub location: Option<String>,
    /// What was being analyzed, as given by the caller.
    pub context: Option<String>,
    /// Display name of the resulting value, if there is one.
    pub result: Option<String>,
}

impl SymbolicDiagnostic {
    pub fn new(reason: DiagnosticReason) -> Self {
        Self {
            reason,
            location: None,
            context: None,
            result: None,
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_result(mut self, value: impl Into<String>) -> Self {
        self.result = Some(value.into());
        self
    }
}

impl fmt::Display for SymbolicDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "symbolic warning: {}", self.reason)?;
        if let Some(location) = self.location.as_deref().filter(|l| !l.is_empty()) {
            write!(f, " at {}", location)?;
        }
        if let Some(ctx) = &self.context {
            write!(f, " ({})", ctx)?;
        }
        if let Some(result) = &self.result {
            write!(f, " -> {}", result)?;
        }
        Ok(())
    }
}

thread_local! {
    static DIAGNOSTICS_ENABLED: RefCell<bool> = const { RefCell::new(false) };
    static DIAGNOSTICS: RefCell<Vec<SymbolicDiagnostic>> = const { RefCell::new(Vec::new()) };
}

/// Collector for symbolic diagnostics.
///
/// Uses thread-local storage, matching the single-threaded analysis model.
/// Disabled by default to avoid overhead.
#[derive(Debug)]
pub struct DiagnosticsCollector;

impl DiagnosticsCollector {
    pub fn enable() {
        DIAGNOSTICS_ENABLED.with(|enabled| {
            *enabled.borrow_mut() = true;
        });
    }

    pub fn disable() {
        DIAGNOSTICS_ENABLED.with(|enabled| {
            *enabled.borrow_mut() = false;
        });
    }

    pub fn is_enabled() -> bool {
        DIAGNOSTICS_ENABLED.with(|enabled| *enabled.borrow())
    }

    /// Add a diagnostic to the collection (if enabled).
    pub fn emit(diagnostic: SymbolicDiagnostic) {
        if Self::is_enabled() {
            DIAGNOSTICS.with(|diags| {
                diags.borrow_mut().push(diagnostic);
            });
        }
    }

    /// Take all collected diagnostics, clearing the collection.
    pub fn take() -> Vec<SymbolicDiagnostic> {
        DIAGNOSTICS.with(|diags| std::mem::take(&mut *diags.borrow_mut()))
    }

    pub fn clear() {
        DIAGNOSTICS.with(|diags| {
            diags.borrow_mut().clear();
        });
    }

    pub fn count() -> usize {
        DIAGNOSTICS.with(|diags| diags.borrow().len())
    }
}

/// Serializes diagnostics for hosts that forward them over a JSON channel.
pub fn diagnostics_to_json(diagnostics: &[SymbolicDiagnostic]) -> serde_json::Result<String> {
    serde_json::to_string(diagnostics)
}

pub fn emit_max_recursion_depth(depth: usize, location: &str, context: Option<&str>) {
    let mut diag = SymbolicDiagnostic::new(DiagnosticReason::MaxRecursionDepth(depth))
        .with_location(location);
    if let Some(ctx) = context {
        diag = diag.with_context(ctx);
    }
    DiagnosticsCollector::emit(diag);
}

pub fn emit_max_intersection_depth(depth: usize) {
    DiagnosticsCollector::emit(SymbolicDiagnostic::new(
        DiagnosticReason::MaxIntersectionDepth(depth),
    ));
}

pub fn emit_empty_intersection(operands: &[String]) {
    DiagnosticsCollector::emit(
        SymbolicDiagnostic::new(DiagnosticReason::EmptyIntersection)
            .with_context(operands.join(" & "))
            .with_result("never"),
    );
}

pub fn emit_widened_to_any(value: &str) {
    DiagnosticsCollector::emit(
        SymbolicDiagnostic::new(DiagnosticReason::WidenedToAny)
            .with_context(value)
            .with_result("any"),
    );
}

pub fn emit_cast_rejected(capability: Capability, value: &str) {
    DiagnosticsCollector::emit(
        SymbolicDiagnostic::new(DiagnosticReason::CapabilityCastRejected(capability))
            .with_context(value),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_disabled_by_default() {
        DiagnosticsCollector::disable();
        DiagnosticsCollector::clear();

        assert!(!DiagnosticsCollector::is_enabled());

        emit_widened_to_any("int");
        assert_eq!(DiagnosticsCollector::count(), 0);
    }

    #[test]
    fn test_diagnostic_collection() {
        DiagnosticsCollector::enable();
        DiagnosticsCollector::clear();

        emit_max_recursion_depth(64, "[0][0]", None);
        emit_max_intersection_depth(21);

        assert_eq!(DiagnosticsCollector::count(), 2);

        let diags = DiagnosticsCollector::take();
        assert_eq!(diags.len(), 2);
        assert_eq!(DiagnosticsCollector::count(), 0);

        assert!(matches!(
            &diags[0].reason,
            DiagnosticReason::MaxRecursionDepth(64)
        ));
        assert_eq!(diags[0].location.as_deref(), Some("[0][0]"));

        DiagnosticsCollector::disable();
    }

    #[test]
    fn test_every_reason_has_an_emitter() {
        DiagnosticsCollector::enable();
        DiagnosticsCollector::clear();

        emit_max_recursion_depth(64, "", None);
        emit_max_intersection_depth(21);
        emit_empty_intersection(&["nil".to_string(), "int".to_string()]);
        emit_widened_to_any("int");
        emit_cast_rejected(Capability::Iterable, "int | nil");

        let diags = DiagnosticsCollector::take();
        DiagnosticsCollector::disable();
        let mut seen = [false; 5];
        for diag in &diags {
            let index = match diag.reason {
                DiagnosticReason::MaxRecursionDepth(_) => 0,
                DiagnosticReason::MaxIntersectionDepth(_) => 1,
                DiagnosticReason::EmptyIntersection => 2,
                DiagnosticReason::WidenedToAny => 3,
                DiagnosticReason::CapabilityCastRejected(_) => 4,
            };
            seen[index] = true;
        }
        assert_eq!(seen, [true; 5]);
    }

    #[test]
    fn test_diagnostic_reason_display() {
        assert_eq!(
            DiagnosticReason::MaxRecursionDepth(64).to_string(),
            "maximum recursion depth (64) exceeded"
        );
        assert_eq!(
            DiagnosticReason::CapabilityCastRejected(Capability::Indexable).to_string(),
            "not every case is indexable"
        );
    }

    #[test]
    fn test_diagnostic_display() {
        let diag = SymbolicDiagnostic::new(DiagnosticReason::EmptyIntersection)
            .with_location(".a")
            .with_context("{a: int} & {a: bool}")
            .with_result("never");

        let display = diag.to_string();
        assert!(display.contains("empty intersection"));
        assert!(display.contains("at .a"));
        assert!(display.contains("{a: int} & {a: bool}"));
        assert!(display.ends_with("-> never"));
    }

    #[test]
    fn test_diagnostics_to_json() {
        let diags = vec![SymbolicDiagnostic::new(DiagnosticReason::WidenedToAny).with_result("any")];
        let json = diagnostics_to_json(&diags).unwrap();
        assert!(json.contains("\"WidenedToAny\""));
        assert!(json.contains("\"result\":\"any\""));
    }
}
