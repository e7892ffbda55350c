//! Per-call recursion state of the structural-compatibility checks.
//!
//! A [`RecTestCallState`] is created by the caller of a top-level `test` and
//! threaded through every nested call. It bounds the recursion depth (the
//! cycle breaker for self-referential values) and remembers where the first
//! mismatch happened so the evaluator can report `.foo[2].bar` instead of a
//! bare "type mismatch".
//!
//! Not thread-safe; one state belongs to one call stack.

use std::fmt;
use std::ops::{Deref, DerefMut};

use crate::config::SymbolicConfig;
use crate::diagnostics::emit_max_recursion_depth;
use crate::error::{SymbolicError, TestResult};
use crate::limits::MAX_RECURSIVE_TEST_CALL_DEPTH;

use super::pattern::Pattern;
use super::value::Value;

/// One step of a location path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathSegment {
    Property(String),
    Index(usize),
    /// The general element of an unbounded sequence.
    Element,
    Parameter(usize),
    Result,
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Property(name) => write!(f, ".{}", name),
            PathSegment::Index(i) => write!(f, "[{}]", i),
            PathSegment::Element => write!(f, "[*]"),
            PathSegment::Parameter(i) => write!(f, ".parameters[{}]", i),
            PathSegment::Result => write!(f, ".result"),
        }
    }
}

/// The first mismatch met during a check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mismatch {
    /// Empty when the mismatch is at the root of the compared values.
    pub location: String,
    pub expected: String,
    pub actual: String,
}

impl Mismatch {
    pub fn at_root(expected: &Value, actual: &Value) -> Self {
        Self {
            location: String::new(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.location.is_empty() {
            write!(f, "at {}: ", self.location)?;
        }
        write!(f, "expected {}, got {}", self.expected, self.actual)
    }
}

#[derive(Debug)]
pub struct RecTestCallState {
    depth: usize,
    max_depth: usize,
    path: Vec<PathSegment>,
    mismatch: Option<Mismatch>,
    origin: Option<String>,
}

impl Default for RecTestCallState {
    fn default() -> Self {
        Self::new()
    }
}

impl RecTestCallState {
    pub fn new() -> Self {
        Self {
            depth: 0,
            max_depth: MAX_RECURSIVE_TEST_CALL_DEPTH,
            path: Vec::new(),
            mismatch: None,
            origin: None,
        }
    }

    pub fn with_config(config: &SymbolicConfig) -> Self {
        Self {
            max_depth: config.max_test_depth,
            ..Self::new()
        }
    }

    /// Names the analysis that started the check (e.g. `argument 1 of f`).
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    /// Current location path.
    pub fn location(&self) -> String {
        self.path.iter().map(ToString::to_string).collect()
    }

    pub fn mismatch(&self) -> Option<&Mismatch> {
        self.mismatch.as_ref()
    }

    pub fn take_mismatch(&mut self) -> Option<Mismatch> {
        self.mismatch.take()
    }

    /// Human-readable description of the first mismatch, prefixed by the origin.
    pub fn mismatch_description(&self) -> Option<String> {
        let mismatch = self.mismatch.as_ref()?;
        Some(match &self.origin {
            Some(origin) => format!("{}: {}", origin, mismatch),
            None => mismatch.to_string(),
        })
    }

    /// Enters one level of recursion. The returned guard leaves it on drop,
    /// including when the callee bails out with `?`.
    pub fn start_call(&mut self) -> Result<CallGuard<'_>, SymbolicError> {
        if self.depth >= self.max_depth {
            let location = self.location();
            emit_max_recursion_depth(self.max_depth, &location, self.origin.as_deref());
            return Err(SymbolicError::MaxRecursionDepthExceeded {
                depth: self.max_depth,
                location,
            });
        }
        self.depth += 1;
        Ok(CallGuard { state: self })
    }

    /// Tests a nested value, recording the location of a failure.
    pub(crate) fn test_at(
        &mut self,
        segment: PathSegment,
        expected: &Value,
        actual: &Value,
    ) -> TestResult {
        self.path.push(segment);
        let result = expected.test(actual, self);
        if let Ok(false) = result {
            self.record_mismatch(expected, actual);
        }
        self.path.pop();
        result
    }

    /// Same as [`Self::test_at`] for a pattern tested against a value.
    pub(crate) fn test_value_at(
        &mut self,
        segment: PathSegment,
        pattern: &Pattern,
        actual: &Value,
    ) -> TestResult {
        self.path.push(segment);
        let result = pattern.test_value(actual, self);
        if let Ok(false) = result {
            if self.mismatch.is_none() {
                self.mismatch = Some(Mismatch {
                    location: self.location(),
                    expected: pattern.to_string(),
                    actual: actual.to_string(),
                });
            }
        }
        self.path.pop();
        result
    }

    /// Records a mismatch at the current location unless one is already known.
    pub(crate) fn record_mismatch(&mut self, expected: &Value, actual: &Value) {
        if self.mismatch.is_none() {
            self.mismatch = Some(Mismatch {
                location: self.location(),
                expected: expected.to_string(),
                actual: actual.to_string(),
            });
        }
    }

    /// Marks the mismatch state before trying alternatives.
    pub(crate) fn mismatch_checkpoint(&self) -> bool {
        self.mismatch.is_some()
    }

    /// Forgets mismatches recorded by alternatives tried since `checkpoint`.
    pub(crate) fn rollback_mismatch(&mut self, checkpoint: bool) {
        if !checkpoint {
            self.mismatch = None;
        }
    }
}

/// Scope of one recursive call; decrements the depth when dropped.
#[derive(Debug)]
pub struct CallGuard<'a> {
    state: &'a mut RecTestCallState,
}

impl Deref for CallGuard<'_> {
    type Target = RecTestCallState;

    fn deref(&self) -> &RecTestCallState {
        self.state
    }
}

impl DerefMut for CallGuard<'_> {
    fn deref_mut(&mut self) -> &mut RecTestCallState {
        self.state
    }
}

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        self.state.depth -= 1;
    }
}
